use std::path::Path;

use tracing::info;

use envgraph_gateway::{ProvisionReport, SimulatedGateway, format_report, provision};
use envgraph_planner::Planner;

use super::{load_config, request_for};

pub fn apply(
    env: &str,
    tenants: Option<Vec<String>>,
    config: Option<&str>,
    state: &str,
) -> anyhow::Result<()> {
    let report = run(env, tenants, config, state)?;
    println!("{}", format_report(&report));
    Ok(())
}

fn run(
    env: &str,
    tenants: Option<Vec<String>>,
    config: Option<&str>,
    state: &str,
) -> anyhow::Result<ProvisionReport> {
    let settings = load_config(config)?;
    let request = request_for(env, tenants, &settings);
    // Every graph error surfaces here, before the backend is touched.
    let plan = Planner::new(settings).plan(&request)?;

    let gateway = SimulatedGateway::open(Path::new(state))?;
    let result = provision(&plan, &gateway);
    // Partial progress is persisted too.
    gateway.persist()?;
    info!(state = %state, applied = result.is_ok(), "persisted backend state");

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tenants_fail_before_touching_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let state = state.to_str().unwrap();

        let tenants = Some(vec!["acme".to_string(), "acme".to_string()]);
        let err = apply("production", tenants, None, state).unwrap_err();
        assert!(err.to_string().contains("duplicate tenant"), "{err}");
        assert!(!Path::new(state).exists());
    }

    #[test]
    fn second_apply_leaves_everything_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let state = state.to_str().unwrap();

        let first = run("staging", None, None, state).unwrap();
        assert_eq!(first.created(), first.resources.len());
        assert!(Path::new(state).exists());

        let second = run("staging", None, None, state).unwrap();
        assert_eq!(second.unchanged(), second.resources.len());
        assert_eq!(second.created(), 0);
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        assert!(apply("qa", None, None, state.to_str().unwrap()).is_err());
    }
}
