//! Training config parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::TrainingConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values,
/// reporting every unset variable in one error.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => result = result.replace(&cap[0], &val),
            Err(_) => missing.push(var_name.to_string()),
        }
    }

    if !missing.is_empty() {
        anyhow::bail!(
            "Missing environment variable(s) referenced by the config: {}",
            missing.join(", ")
        );
    }

    Ok(result)
}

/// Parse a training config from a YAML string.
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML does not
/// describe a training config (not a mapping, missing required keys,
/// wrong types).
pub fn parse_training_str(yaml_str: &str) -> Result<TrainingConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: TrainingConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse training config YAML")?;
    Ok(config)
}

/// Parse a training config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its contents are
/// invalid.
pub fn parse_training(path: &Path) -> Result<TrainingConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("No training config found at: {}", path.display()))?;
    parse_training_str(&content)
}
