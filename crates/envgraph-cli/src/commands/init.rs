use std::path::Path;

use tracing::info;

use envgraph_core::StackConfig;

pub fn init(path: &str, name: &str, domain: &str) -> anyhow::Result<()> {
    let output = Path::new(path).join("envgraph.toml");
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }

    let config = StackConfig::scaffold(name, domain);
    std::fs::write(&output, config.to_toml_string()?)?;
    info!(path = %output.display(), name = %name, domain = %domain, "wrote scaffold config");
    println!("✓ Generated {}", output.display());

    Ok(())
}
