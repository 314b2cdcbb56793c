use envgraph_planner::{Planner, format_plan};

use super::{load_config, request_for};

pub fn plan(
    env: &str,
    tenants: Option<Vec<String>>,
    config: Option<&str>,
    format: &str,
) -> anyhow::Result<()> {
    let settings = load_config(config)?;
    let request = request_for(env, tenants, &settings);
    let plan = Planner::new(settings).plan(&request)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        _ => {
            println!("{}", format_plan(&plan));
        }
    }

    Ok(())
}
