use serde::{Deserialize, Serialize};

use crate::resolve::RefSyntax;

/// Literal `model.upload_criteria` value that gates the upload on the
/// eval stage's outcome.
pub const UPLOAD_CRITERIA_EVAL: &str = "eval";

/// Parsed training config. Immutable after load; owned by the runner
/// for the duration of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub train: String,
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default)]
    pub eval: Option<String>,
    #[serde(default)]
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub ref_syntax: RefSyntax,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub fetch: Option<String>,
    #[serde(default)]
    pub prepro: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path of the trained artifact, relative to the run's base dir.
    pub path: String,
    #[serde(default)]
    pub upload_criteria: Option<String>,
}

impl TrainingConfig {
    pub fn train_ref(&self) -> &str {
        &self.train
    }

    pub fn test_ref(&self) -> Option<&str> {
        self.test.as_deref()
    }

    pub fn eval_ref(&self) -> Option<&str> {
        self.eval.as_deref()
    }

    pub fn dataset_fetch_ref(&self) -> Option<&str> {
        self.dataset.fetch.as_deref()
    }

    pub fn dataset_prepro_ref(&self) -> Option<&str> {
        self.dataset.prepro.as_deref()
    }

    pub fn model_path(&self) -> &str {
        &self.model.path
    }

    /// Whether a failed eval stage should stop the model from being
    /// uploaded. Strict equality with the literal `eval`.
    pub fn eval_gates_upload(&self) -> bool {
        self.model.upload_criteria.as_deref() == Some(UPLOAD_CRITERIA_EVAL)
    }
}
