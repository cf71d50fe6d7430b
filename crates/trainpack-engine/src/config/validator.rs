//! Semantic validation for parsed training configs.

use anyhow::{bail, Result};

use crate::config::types::TrainingConfig;
use crate::resolve::parse_stage_ref;

/// Validate a parsed training config.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing every violation found, so a broken config
/// is fixed in one pass.
pub fn validate_training(config: &TrainingConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.train.trim().is_empty() {
        errors.push("train reference must not be empty".to_string());
    }

    if config.model.path.trim().is_empty() {
        errors.push("model.path must not be empty".to_string());
    }

    if config.eval_gates_upload() && config.eval_ref().is_none() {
        errors.push(
            "model.upload_criteria is 'eval' but no eval reference is configured".to_string(),
        );
    }

    // Every configured reference must parse under the configured syntax;
    // registry resolution happens later, at run/check time.
    let refs = [
        ("train", Some(config.train_ref())),
        ("test", config.test_ref()),
        ("eval", config.eval_ref()),
        ("dataset.fetch", config.dataset_fetch_ref()),
        ("dataset.prepro", config.dataset_prepro_ref()),
    ];
    for (key, reference) in refs {
        let Some(reference) = reference else { continue };
        if reference.trim().is_empty() {
            continue; // already reported for train; optional empties are treated as unset
        }
        if let Err(e) = parse_stage_ref(reference, config.ref_syntax) {
            errors.push(format!("{key}: {e}"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!(
            "Training config validation failed:\n  - {}",
            errors.join("\n  - ")
        );
    }
}
