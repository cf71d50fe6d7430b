//! Run and check result types.

/// Outcome of one training run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Labels of the stages that actually ran, in order.
    pub stages_run: Vec<String>,
    /// Eval outcome, when the eval stage ran. A stage that returned no
    /// value counts as not passed.
    pub eval_passed: Option<bool>,
    /// Whether the artifact was uploaded.
    pub uploaded: bool,
    /// Remote key the artifact was uploaded under.
    pub artifact_key: Option<String>,
    /// Whether the completion report reached the control plane.
    pub reported: bool,
    pub duration_secs: f64,
}

/// Result of checking one configured stage reference.
#[derive(Debug, Clone)]
pub struct RefCheck {
    pub stage: String,
    pub reference: String,
    pub ok: bool,
    /// Resolution error message when `ok` is false.
    pub message: String,
}

/// Result of a training config check.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub refs: Vec<RefCheck>,
}

impl CheckReport {
    pub fn all_ok(&self) -> bool {
        self.refs.iter().all(|r| r.ok)
    }
}
