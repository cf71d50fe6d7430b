use std::path::Path;

use anyhow::{Context, Result};

use trainpack_engine::config::{parser, validator};
use trainpack_engine::orchestrator;

use crate::plugins;

/// Execute the `check` command: validate the training config and verify
/// every configured stage reference resolves against the registry.
pub fn execute(config_path: &Path) -> Result<()> {
    let config = parser::parse_training(config_path)
        .with_context(|| format!("Failed to load training config: {}", config_path.display()))?;
    validator::validate_training(&config)?;
    println!("Training config:   OK");

    let registry = plugins::build_registry();
    let report = orchestrator::check_training(&config, &registry);

    for check in &report.refs {
        let status = if check.ok { "OK" } else { "FAILED" };
        println!("{:18} {}", format!("{}:", check.stage), status);
        if !check.message.is_empty() {
            println!("  {}", check.message);
        }
    }

    if report.all_ok() {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more stage references failed to resolve")
    }
}
