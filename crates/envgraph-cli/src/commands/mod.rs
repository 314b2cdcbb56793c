pub mod apply;
pub mod init;
pub mod plan;

use std::path::Path;

use envgraph_core::{DeploymentRequest, EnvironmentName, StackConfig};

const DEFAULT_CONFIG: &str = "envgraph.toml";

/// Explicit path, else `./envgraph.toml` when present, else defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<StackConfig> {
    match path {
        Some(path) => StackConfig::from_file(Path::new(path)),
        None if Path::new(DEFAULT_CONFIG).exists() => StackConfig::from_file(Path::new(DEFAULT_CONFIG)),
        None => Ok(StackConfig::default()),
    }
}

/// Build the request; `--tenants` wins over the config file.
pub fn request_for(env: &str, tenants: Option<Vec<String>>, settings: &StackConfig) -> DeploymentRequest {
    let tenant_ids = tenants.unwrap_or_else(|| {
        env.parse::<EnvironmentName>()
            .map(|name| settings.tenants_for(name))
            .unwrap_or_default()
    });
    DeploymentRequest {
        environment_name: env.to_string(),
        tenant_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_config_tenants() {
        let mut settings = StackConfig::default();
        settings.environments.insert(
            "production".to_string(),
            envgraph_core::config::EnvironmentConfig {
                tenants: vec!["acme".to_string()],
            },
        );

        let from_file = request_for("production", None, &settings);
        assert_eq!(from_file.tenant_ids, vec!["acme".to_string()]);

        let from_flag = request_for("production", Some(vec!["globex".to_string()]), &settings);
        assert_eq!(from_flag.tenant_ids, vec!["globex".to_string()]);
    }

    #[test]
    fn unknown_environment_passes_through() {
        let request = request_for("qa", None, &StackConfig::default());
        assert_eq!(request.environment_name, "qa");
        assert!(request.tenant_ids.is_empty());
    }

    #[test]
    fn explicit_config_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("envgraph.toml");
        std::fs::write(&path, "[stack]\ndomain = \"shop.io\"\n").unwrap();
        let settings = load_config(path.to_str()).unwrap();
        assert_eq!(settings.stack.domain, "shop.io");
    }
}
