//! Error taxonomy for a training run.
//!
//! Configuration problems (env, config file) fail before any stage
//! runs; resolution problems name the offending reference; stage
//! failures carry the stage label. Reporting failures never appear
//! here; the orchestrator logs and swallows them.

use std::path::PathBuf;

/// One or more required environment variables were not set. All missing
/// names are collected before this is raised, so the operator sees the
/// full list in one message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("required environment variable(s) not set: {}", .0.join(", "))]
pub struct EnvError(pub Vec<String>);

/// A stage reference string could not be turned into a registered
/// function. Malformed references are rejected before the registry is
/// consulted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("stage reference '{reference}' is missing a '{separator}' separator")]
    MissingSeparator { reference: String, separator: char },

    #[error("no module segment in stage reference '{reference}'")]
    EmptyModule { reference: String },

    #[error("no function segment in stage reference '{reference}'")]
    EmptyFunction { reference: String },

    #[error("no module named '{module}' is registered (stage reference '{reference}')")]
    UnknownModule { module: String, reference: String },

    #[error("no function named '{function}' is registered on module '{module}'")]
    UnknownFunction { function: String, module: String },
}

/// Fatal pipeline error. The top-level caller decides the exit code;
/// the engine never terminates the process itself.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("can't find trained model at path '{}'", .0.display())]
    MissingArtifact(PathBuf),

    #[error("model artifact upload failed: {0}")]
    Upload(#[source] anyhow::Error),
}
