//! Tenant subgraphs, the only conditionally included part of a topology.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use envgraph_core::{EnvironmentName, ResourceDescriptor, ResourceKind};

use crate::error::{PlanError, PlanResult};
use crate::ids;
use crate::resolver::EnvironmentParameters;

static TENANT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex"));

/// Hostname labels tenants may not claim.
const RESERVED_LABELS: [&str; 2] = ["api", "www"];

/// Whether tenant subgraphs belong in this environment.
pub fn includes_tenants(params: &EnvironmentParameters) -> bool {
    params.is_multi_tenant && !params.tenants.is_empty()
}

/// Reject duplicates and ids that cannot become hostnames.
pub fn validate_tenants(tenants: &[String]) -> PlanResult<()> {
    let mut seen = HashSet::with_capacity(tenants.len());
    for tenant in tenants {
        if !TENANT_LABEL.is_match(tenant) {
            return Err(PlanError::InvalidTenant {
                tenant: tenant.clone(),
                reason: "must be a lowercase DNS label".to_string(),
            });
        }
        let reserved = RESERVED_LABELS.contains(&tenant.as_str())
            || EnvironmentName::ALL.iter().any(|env| env.as_str() == tenant);
        if reserved {
            return Err(PlanError::InvalidTenant {
                tenant: tenant.clone(),
                reason: "collides with a reserved hostname".to_string(),
            });
        }
        if !seen.insert(tenant.as_str()) {
            return Err(PlanError::DuplicateTenant(tenant.clone()));
        }
    }
    Ok(())
}

/// Storage pair, distribution and hostname record for one tenant.
pub fn tenant_subgraph(params: &EnvironmentParameters, tenant: &str) -> Vec<ResourceDescriptor> {
    let slug = params.domain_slug();
    let removal = params.settings.storage.removal_policy.as_str();
    let hostname = params.hostname(tenant);
    let frontend_bucket = ids::tenant_frontend_bucket(tenant);
    let distribution = ids::tenant_distribution(tenant);

    let media = ResourceDescriptor::new(ids::tenant_media_bucket(tenant), ResourceKind::Bucket)
        .for_tenant(tenant)
        .with("bucket_name", format!("{tenant}-media-bucket-{slug}"))
        .with("encryption", "kms_managed")
        .with("block_public_access", true)
        .with("public_read", false)
        .with("removal_policy", removal);

    let frontend = ResourceDescriptor::new(frontend_bucket.as_str(), ResourceKind::Bucket)
        .for_tenant(tenant)
        .with("bucket_name", format!("{tenant}-frontend-bucket-{slug}"))
        .with("public_read", true)
        .with("removal_policy", removal);

    let delivery = ResourceDescriptor::new(distribution.as_str(), ResourceKind::Distribution)
        .for_tenant(tenant)
        .with("domain_names", vec![hostname.clone()])
        .with("origin", frontend_bucket.as_str())
        .with("default_root_object", "index.html")
        .with("error_page", "/index.html")
        .depends_on(frontend_bucket)
        .depends_on(ids::FRONTEND_CERTIFICATE);

    let record = ResourceDescriptor::new(ids::tenant_dns(tenant), ResourceKind::DnsRecord)
        .for_tenant(tenant)
        .with("record_type", "CNAME")
        .with("hostname", hostname)
        .with("target", distribution.as_str())
        .with("zone_id", params.settings.stack.hosted_zone_id.as_str())
        .depends_on(distribution)
        .depends_on(ids::FRONTEND_CERTIFICATE);

    vec![media, frontend, delivery, record]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenants(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn duplicate_tenant_is_an_error() {
        let err = validate_tenants(&tenants(&["acme", "globex", "acme"])).unwrap_err();
        assert_eq!(err, PlanError::DuplicateTenant("acme".to_string()));
    }

    #[test]
    fn tenant_must_be_a_dns_label() {
        for bad in ["Acme", "-acme", "acme-", "ac me", "acme.io", ""] {
            assert!(
                matches!(
                    validate_tenants(&tenants(&[bad])),
                    Err(PlanError::InvalidTenant { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_tenants(&tenants(&["acme", "globex-2", "x"])).is_ok());
    }

    #[test]
    fn reserved_labels_are_rejected() {
        for bad in ["unstable", "staging", "production", "api", "www"] {
            assert!(matches!(
                validate_tenants(&tenants(&[bad])),
                Err(PlanError::InvalidTenant { .. })
            ));
        }
    }
}
