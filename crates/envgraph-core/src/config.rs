//! envgraph.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::request::EnvironmentName;
use crate::types::RemovalPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub stack: StackSection,
    pub certificates: CertificatesConfig,
    pub compute: ComputeConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub perimeter: PerimeterConfig,
    /// Keyed by environment name.
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSection {
    /// Product name used inside resource names.
    pub name: String,
    /// Apex domain; environment and tenant hostnames hang off it.
    pub domain: String,
    pub region: String,
    pub hosted_zone_id: String,
}

impl Default for StackSection {
    fn default() -> Self {
        Self {
            name: "api".to_string(),
            domain: "example.io".to_string(),
            region: "eu-central-1".to_string(),
            hosted_zone_id: "Z0000000000000000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificatesConfig {
    /// Certificate fronting the content-delivery distributions.
    pub frontend_arn: String,
    /// Certificate on the compute cluster's load balancer.
    pub backend_arn: String,
}

impl Default for CertificatesConfig {
    fn default() -> Self {
        Self {
            frontend_arn: "arn:aws:acm:us-east-1:000000000000:certificate/frontend".to_string(),
            backend_arn: "arn:aws:acm:eu-central-1:000000000000:certificate/backend".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    pub cpu: u32,
    pub memory_mib: u32,
    pub desired_count: u32,
    /// Image tag for the per-environment api and proxy repositories.
    pub image_tag: String,
    pub agent_image: String,
    pub health_check_path: String,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            cpu: 1024,
            memory_mib: 2048,
            desired_count: 1,
            image_tag: "latest".to_string(),
            agent_image: "public.ecr.aws/datadog/agent:latest".to_string(),
            health_check_path: "/heartbeat".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub engine_version: String,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub auto_pause_minutes: u32,
    pub port: u16,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine_version: "aurora-postgresql-10.18".to_string(),
            min_capacity: 2,
            max_capacity: 8,
            auto_pause_minutes: 10,
            port: 5432,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub retention_days: u32,
    pub stream_shards: u32,
    pub stream_retention_hours: u32,
    /// HTTP intake the delivery stream forwards to.
    pub forwarder_endpoint: String,
    /// Name of the secret holding the forwarder API key.
    pub forwarder_key_secret: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            retention_days: 180,
            stream_shards: 3,
            stream_retention_hours: 48,
            forwarder_endpoint: "https://aws-kinesis-http-intake-logs.datadoghq.eu/v1/input".to_string(),
            forwarder_key_secret: "forwarder-api-key".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub removal_policy: RemovalPolicy,
}

/// Which resource kinds get "deny unless from the network endpoint" policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerimeterConfig {
    pub bucket: bool,
    pub queue: bool,
}

impl Default for PerimeterConfig {
    fn default() -> Self {
        Self { bucket: true, queue: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub tenants: Vec<String>,
}

impl StackConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StackConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Tenants configured for `environment`, empty when none are listed.
    pub fn tenants_for(&self, environment: EnvironmentName) -> Vec<String> {
        self.environments
            .get(environment.as_str())
            .map(|e| e.tenants.clone())
            .unwrap_or_default()
    }

    /// Scaffold a config for the given product and domain.
    pub fn scaffold(name: &str, domain: &str) -> Self {
        let mut environments = BTreeMap::new();
        environments.insert(
            EnvironmentName::Production.as_str().to_string(),
            EnvironmentConfig::default(),
        );
        StackConfig {
            stack: StackSection {
                name: name.to_string(),
                domain: domain.to_string(),
                ..Default::default()
            },
            environments,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = StackConfig::scaffold("shop", "shop.io");
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("shop.io"));
        assert!(toml_str.contains("[environments.production]"));
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config: StackConfig = toml::from_str("").unwrap();
        assert_eq!(config, StackConfig::default());
        assert!(config.perimeter.bucket);
        assert_eq!(config.logging.stream_shards, 3);
    }

    #[test]
    fn test_parse_tenants() {
        let toml_str = r#"
[stack]
domain = "shop.io"

[perimeter]
queue = false

[environments.production]
tenants = ["acme", "globex"]
"#;
        let config: StackConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stack.domain, "shop.io");
        assert_eq!(config.stack.region, "eu-central-1");
        assert!(!config.perimeter.queue);
        assert_eq!(
            config.tenants_for(EnvironmentName::Production),
            vec!["acme".to_string(), "globex".to_string()]
        );
        assert!(config.tenants_for(EnvironmentName::Staging).is_empty());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("envgraph.toml");
        std::fs::write(&path, "[storage]\nremoval_policy = \"retain\"\n").unwrap();
        let config = StackConfig::from_file(&path).unwrap();
        assert_eq!(config.storage.removal_policy, RemovalPolicy::Retain);
    }
}
