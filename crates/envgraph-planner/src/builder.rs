//! Topology builder — the full resource graph for one environment.
//!
//! The always-present subgraph is built first, then tenant subgraphs are
//! appended when [`includes_tenants`] holds. `depends_on` edges carry only
//! genuine data needs (an endpoint, a name, an ARN). Ordering-only edges
//! are the grant wiring's business.
//!
//! ```text
//! network ─┬─ s3 endpoint
//!          └─ sqs endpoint ───────────────┐
//! secret ── database ─────────────────────┤
//! queue, backend bucket, log groups ──────┼── compute cluster ── api record
//! backend certificate ────────────────────┘          │
//! log stream ── log subscriptions (one per log group)┘
//! frontend bucket ── distribution ── frontend record
//! ```

use serde_json::json;
use tracing::{debug, info};

use envgraph_core::{EnvironmentTopology, ResourceDescriptor, ResourceKind};

use crate::error::PlanResult;
use crate::ids;
use crate::resolver::EnvironmentParameters;
use crate::tenants::{includes_tenants, tenant_subgraph, validate_tenants};

pub fn build(params: &EnvironmentParameters) -> PlanResult<EnvironmentTopology> {
    let with_tenants = includes_tenants(params);
    if with_tenants {
        validate_tenants(&params.tenants)?;
    }

    let mut topology = EnvironmentTopology::new(params.environment);
    let base = [
        network(params),
        certificates(params, with_tenants),
        frontend(params),
        backend_storage(params),
        database(params),
        messaging(params),
        log_groups(params),
        compute(params),
        telemetry(params),
    ];
    for descriptor in base.into_iter().flatten() {
        topology.insert(descriptor)?;
    }

    if with_tenants {
        for tenant in &params.tenants {
            for descriptor in tenant_subgraph(params, tenant) {
                topology.insert(descriptor)?;
            }
            debug!(tenant = %tenant, "added tenant subgraph");
        }
    }

    topology.tag_all("env", params.environment.as_str());

    info!(
        environment = %params.environment,
        resources = topology.len(),
        tenants = topology.tenants().len(),
        "built topology"
    );
    Ok(topology)
}

fn network(params: &EnvironmentParameters) -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new(ids::NETWORK, ResourceKind::Network)
            .with("name", format!("{}-network", params.prefix))
            .with("max_azs", 3),
        ResourceDescriptor::new(ids::S3_ENDPOINT, ResourceKind::NetworkEndpoint)
            .with("service", "s3")
            .with("endpoint_type", "gateway")
            .depends_on(ids::NETWORK),
        ResourceDescriptor::new(ids::SQS_ENDPOINT, ResourceKind::NetworkEndpoint)
            .with("service", "sqs")
            .with("endpoint_type", "interface")
            .depends_on(ids::NETWORK),
    ]
}

/// Imported certificates. The frontend one must cover every hostname the
/// environment serves, tenant hostnames included.
fn certificates(params: &EnvironmentParameters, with_tenants: bool) -> Vec<ResourceDescriptor> {
    let mut frontend_names = vec![params.hostname(&params.prefix)];
    if with_tenants {
        frontend_names.extend(params.tenants.iter().map(|t| params.hostname(t)));
    }
    let api_host = params.hostname(&format!("api.{}", params.prefix));

    vec![
        ResourceDescriptor::new(ids::FRONTEND_CERTIFICATE, ResourceKind::Certificate)
            .with("arn", params.settings.certificates.frontend_arn.as_str())
            .with("domains", frontend_names),
        ResourceDescriptor::new(ids::BACKEND_CERTIFICATE, ResourceKind::Certificate)
            .with("arn", params.settings.certificates.backend_arn.as_str())
            .with("domains", vec![api_host]),
    ]
}

fn frontend(params: &EnvironmentParameters) -> Vec<ResourceDescriptor> {
    let hostname = params.hostname(&params.prefix);
    vec![
        ResourceDescriptor::new(ids::FRONTEND_BUCKET, ResourceKind::Bucket)
            .with("bucket_name", params.resource_name("bucket-frontend"))
            .with("block_public_access", true)
            .with("public_read", false)
            .with("auto_delete_objects", true)
            .with("removal_policy", params.settings.storage.removal_policy.as_str()),
        ResourceDescriptor::new(ids::FRONTEND_DISTRIBUTION, ResourceKind::Distribution)
            .with("domain_names", vec![hostname.clone()])
            .with("origin", ids::FRONTEND_BUCKET)
            .with("default_root_object", "index.html")
            .with("error_page", "/index.html")
            .depends_on(ids::FRONTEND_BUCKET)
            .depends_on(ids::FRONTEND_CERTIFICATE),
        ResourceDescriptor::new(ids::FRONTEND_DNS, ResourceKind::DnsRecord)
            .with("record_type", "CNAME")
            .with("hostname", hostname)
            .with("target", ids::FRONTEND_DISTRIBUTION)
            .with("zone_id", params.settings.stack.hosted_zone_id.as_str())
            .depends_on(ids::FRONTEND_DISTRIBUTION),
    ]
}

fn backend_storage(params: &EnvironmentParameters) -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new(ids::BACKEND_BUCKET, ResourceKind::Bucket)
            .with("bucket_name", params.resource_name("bucket-api"))
            .with("encryption", "kms_managed")
            .with("block_public_access", true)
            .with("public_read", false)
            .with("removal_policy", params.settings.storage.removal_policy.as_str()),
    ]
}

fn database(params: &EnvironmentParameters) -> Vec<ResourceDescriptor> {
    let db = &params.settings.database;
    let secret_name = format!("{}-database-credentials-{}", params.prefix, params.settings.stack.name);
    vec![
        ResourceDescriptor::new(ids::DATABASE_SECRET, ResourceKind::Secret)
            .with("secret_name", secret_name)
            .with("username", format!("{}{}", params.settings.stack.name, params.prefix))
            .with("password_length", 16)
            .with("exclude_punctuation", true),
        ResourceDescriptor::new(ids::DATABASE, ResourceKind::Database)
            .with("database_name", database_name(params))
            .with("engine", db.engine_version.as_str())
            .with("data_api", true)
            .with("port", db.port)
            .with(
                "scaling",
                json!({
                    "min_capacity": db.min_capacity,
                    "max_capacity": db.max_capacity,
                    "auto_pause_minutes": db.auto_pause_minutes,
                }),
            )
            .with("credentials", ids::DATABASE_SECRET)
            .depends_on(ids::NETWORK)
            .depends_on(ids::DATABASE_SECRET),
    ]
}

fn database_name(params: &EnvironmentParameters) -> String {
    format!("{}{}", params.prefix, params.settings.stack.name.replace('-', ""))
}

fn messaging(_params: &EnvironmentParameters) -> Vec<ResourceDescriptor> {
    vec![ResourceDescriptor::new(ids::QUEUE, ResourceKind::Queue).with("encryption", "kms_managed")]
}

fn log_groups(params: &EnvironmentParameters) -> Vec<ResourceDescriptor> {
    ids::LOG_SOURCES
        .iter()
        .map(|source| {
            ResourceDescriptor::new(ids::log_group(source), ResourceKind::LogGroup)
                .with(
                    "log_group_name",
                    format!("/ecs/{}/{source}", params.hostname(&params.prefix)),
                )
                .with("retention_days", params.settings.logging.retention_days)
                .with("removal_policy", params.settings.storage.removal_policy.as_str())
        })
        .collect()
}

fn compute(params: &EnvironmentParameters) -> Vec<ResourceDescriptor> {
    let compute = &params.settings.compute;
    let mut cluster = ResourceDescriptor::new(ids::COMPUTE_CLUSTER, ResourceKind::ComputeCluster)
        .with("cluster_name", format!("{}-{}-cluster", params.prefix, params.settings.stack.name))
        .with("cpu", compute.cpu)
        .with("memory_mib", compute.memory_mib)
        .with("desired_count", compute.desired_count)
        .with("health_check_path", compute.health_check_path.as_str())
        .with(
            "images",
            json!({
                "api": format!("{}/api:{}", params.prefix, compute.image_tag),
                "proxy": format!("{}/nginx:{}", params.prefix, compute.image_tag),
                "agent": compute.agent_image,
            }),
        )
        .with("database_name", database_name(params))
        .with("database", ids::DATABASE)
        .with("database_credentials", ids::DATABASE_SECRET)
        .with("storage_bucket", ids::BACKEND_BUCKET)
        .with("broker_queue", ids::QUEUE)
        .with("agent_api_key", ids::FORWARDER_KEY_SECRET)
        .with("listener_certificate", ids::BACKEND_CERTIFICATE)
        .with("region", params.settings.stack.region.as_str())
        .depends_on(ids::NETWORK)
        .depends_on(ids::SQS_ENDPOINT)
        .depends_on(ids::DATABASE)
        .depends_on(ids::DATABASE_SECRET)
        .depends_on(ids::FORWARDER_KEY_SECRET)
        .depends_on(ids::BACKEND_BUCKET)
        .depends_on(ids::QUEUE)
        .depends_on(ids::BACKEND_CERTIFICATE);
    for source in ids::LOG_SOURCES {
        cluster = cluster.depends_on(ids::log_group(source));
    }

    let api_record = ResourceDescriptor::new(ids::API_DNS, ResourceKind::DnsRecord)
        .with("record_type", "CNAME")
        .with("hostname", params.hostname(&format!("api.{}", params.prefix)))
        .with("target", ids::COMPUTE_CLUSTER)
        .with("zone_id", params.settings.stack.hosted_zone_id.as_str())
        .depends_on(ids::COMPUTE_CLUSTER);

    vec![cluster, api_record]
}

/// Log stream, its forwarder, and one subscription per application log
/// group. Delivery resources name their role in config rather than
/// depending on it; the grant wiring orders them after it.
fn telemetry(params: &EnvironmentParameters) -> Vec<ResourceDescriptor> {
    let logging = &params.settings.logging;
    let mut resources = vec![
        ResourceDescriptor::new(ids::FORWARDER_KEY_SECRET, ResourceKind::Secret)
            .with("secret_name", logging.forwarder_key_secret.as_str())
            .with("imported", true),
        ResourceDescriptor::new(ids::LOG_DELIVERY_ROLE, ResourceKind::Role)
            .with("assumed_by", "logs.amazonaws.com"),
        ResourceDescriptor::new(ids::STREAM_FORWARDER_ROLE, ResourceKind::Role)
            .with("role_name", format!("{}-stream-forwarder", params.prefix))
            .with("assumed_by", "firehose.amazonaws.com"),
        ResourceDescriptor::new(ids::STREAM_BACKUP_BUCKET, ResourceKind::Bucket)
            .with("bucket_name", params.resource_name("stream-backup"))
            .with("encryption", "kms_managed")
            .with("block_public_access", true)
            .with("public_read", false)
            .with("removal_policy", params.settings.storage.removal_policy.as_str()),
        ResourceDescriptor::new(ids::LOG_STREAM, ResourceKind::LogStream)
            .with("stream_name", format!("{}-log-stream", params.prefix))
            .with("shard_count", logging.stream_shards)
            .with("retention_hours", logging.stream_retention_hours),
        ResourceDescriptor::new(ids::LOG_FORWARDER, ResourceKind::DeliveryStream)
            .with("source", ids::LOG_STREAM)
            .with("endpoint_url", logging.forwarder_endpoint.as_str())
            .with("access_key", ids::FORWARDER_KEY_SECRET)
            .with("backup_bucket", ids::STREAM_BACKUP_BUCKET)
            .with("buffer_size_mb", 4)
            .with("retry_seconds", 60)
            .with(envgraph_core::DELIVERY_ROLE_KEY, ids::STREAM_FORWARDER_ROLE)
            .depends_on(ids::LOG_STREAM)
            .depends_on(ids::STREAM_BACKUP_BUCKET)
            .depends_on(ids::FORWARDER_KEY_SECRET),
    ];

    for source in ids::LOG_SOURCES {
        resources.push(
            ResourceDescriptor::new(ids::log_subscription(source), ResourceKind::LogSubscription)
                .with("log_group", ids::log_group(source))
                .with("destination", ids::LOG_STREAM)
                .with("filter_pattern", "")
                .with("stream_prefix_source", ids::COMPUTE_CLUSTER)
                .with(envgraph_core::DELIVERY_ROLE_KEY, ids::LOG_DELIVERY_ROLE)
                .depends_on(ids::log_group(source))
                .depends_on(ids::LOG_STREAM)
                .depends_on(ids::COMPUTE_CLUSTER),
        );
    }
    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use envgraph_core::{DeploymentRequest, StackConfig};

    use crate::error::PlanError;
    use crate::resolver::Resolver;

    fn params(env: &str, tenants: &[&str]) -> EnvironmentParameters {
        Resolver::new(StackConfig::default())
            .resolve(&DeploymentRequest::new(env, tenants))
            .unwrap()
    }

    #[test]
    fn staging_has_no_tenant_resources() {
        let topology = build(&params("staging", &["acme"])).unwrap();
        assert!(topology.resources().all(|d| !d.is_tenant_scoped()));
        assert!(topology.tenants().is_empty());
        assert_eq!(topology.of_kind(ResourceKind::Distribution).count(), 1);
    }

    #[test]
    fn production_appends_tenant_subgraphs() {
        let topology = build(&params("production", &["acme", "globex"])).unwrap();
        assert_eq!(topology.tenants().len(), 2);
        for tenant in ["acme", "globex"] {
            let dns = topology.get(&ids::tenant_dns(tenant)).unwrap();
            assert!(dns.depends_on.contains(ids::FRONTEND_CERTIFICATE));
            assert!(topology.contains(&ids::tenant_media_bucket(tenant)));
            assert!(topology.contains(&ids::tenant_frontend_bucket(tenant)));
        }
    }

    #[test]
    fn frontend_certificate_covers_tenant_hostnames() {
        let topology = build(&params("production", &["acme"])).unwrap();
        let cert = topology.get(ids::FRONTEND_CERTIFICATE).unwrap();
        let domains = cert.config["domains"].as_array().unwrap();
        assert!(domains.iter().any(|d| d == "acme.example.io"));
        assert!(domains.iter().any(|d| d == "production.example.io"));
    }

    #[test]
    fn duplicate_tenants_fail_the_build() {
        let err = build(&params("production", &["acme", "acme"])).unwrap_err();
        assert_eq!(err, PlanError::DuplicateTenant("acme".to_string()));
    }

    #[test]
    fn compute_cluster_depends_on_its_data_sources() {
        let topology = build(&params("staging", &[])).unwrap();
        let cluster = topology.get(ids::COMPUTE_CLUSTER).unwrap();
        for dep in [ids::NETWORK, ids::DATABASE, ids::QUEUE, ids::BACKEND_BUCKET] {
            assert!(cluster.depends_on.contains(dep), "missing {dep}");
        }
    }

    #[test]
    fn delivery_resources_name_their_role_without_depending_on_it() {
        let topology = build(&params("staging", &[])).unwrap();
        for sub in topology.of_kind(ResourceKind::LogSubscription) {
            assert_eq!(sub.delivery_role(), Some(ids::LOG_DELIVERY_ROLE));
            assert!(!sub.depends_on.contains(ids::LOG_DELIVERY_ROLE));
            assert!(sub.must_follow.is_empty());
        }
    }

    #[test]
    fn every_descriptor_is_tagged() {
        let topology = build(&params("unstable", &[])).unwrap();
        assert!(topology
            .resources()
            .all(|d| d.tags.get("env").map(String::as_str) == Some("unstable")));
    }
}
