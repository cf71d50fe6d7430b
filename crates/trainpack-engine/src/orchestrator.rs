//! Training orchestrator: runs the stage pipeline in fixed order and
//! finalizes with upload and completion report.
//!
//! One run is fully sequential. Every stage failure aborts the run; the
//! caller owns the process exit code.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use trainpack_sdk::{LogSink, Registry, StageIo, StageResult};

use crate::config::types::TrainingConfig;
use crate::errors::PipelineError;
use crate::report::{StatusReporter, TrainedPayload};
use crate::resolve;
use crate::result::{CheckReport, RefCheck, RunReport};
use crate::upload::{prepare_artifact, ArtifactStore};

/// Per-run parameters that come from the environment rather than the
/// training config.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory the model path is resolved against.
    pub base_dir: PathBuf,
    /// Remote key base for the uploaded artifact (extension is derived
    /// from the local artifact).
    pub remote_key: String,
    pub deployment_uid: String,
    pub with_api_deploy: bool,
}

/// Resolve and invoke one stage, with a fresh tee scope tagged by the
/// stage label. The scope ends when `io` drops, on success and on
/// error alike.
fn run_stage(
    registry: &Registry,
    config: &TrainingConfig,
    label: &str,
    reference: &str,
    sink: &Arc<dyn LogSink>,
) -> Result<StageResult, PipelineError> {
    let func = resolve::resolve(registry, reference, config.ref_syntax)?;

    tracing::info!(stage = label, reference, "running stage");
    let mut io = StageIo::tee(Arc::clone(sink), label);
    func(&mut io).map_err(|e| PipelineError::Stage {
        stage: label.to_string(),
        source: e,
    })
}

/// Run the training pipeline end-to-end:
///
/// 1. fetch dataset (if configured)
/// 2. preprocess dataset (if configured)
/// 3. train
/// 4. test (if configured)
/// 5. eval (if configured)
/// 6. upload the model (skipped, successfully, when the eval gate failed)
/// 7. report completion to the control plane (best-effort)
///
/// # Errors
///
/// Any resolution failure, stage failure, or upload failure aborts the
/// run. Reporting failures never do.
pub async fn run_training<S, R>(
    config: &TrainingConfig,
    registry: &Registry,
    sink: Arc<dyn LogSink>,
    store: &S,
    reporter: &R,
    opts: &RunOptions,
) -> Result<RunReport, PipelineError>
where
    S: ArtifactStore,
    R: StatusReporter,
{
    let started = Instant::now();
    let mut report = RunReport::default();

    if let Some(reference) = config.dataset_fetch_ref() {
        run_stage(registry, config, "fetch dataset", reference, &sink)?;
        report.stages_run.push("fetch dataset".to_string());
    }

    if let Some(reference) = config.dataset_prepro_ref() {
        run_stage(registry, config, "preprocess dataset", reference, &sink)?;
        report.stages_run.push("preprocess dataset".to_string());
    }

    run_stage(registry, config, "train", config.train_ref(), &sink)?;
    report.stages_run.push("train".to_string());

    if let Some(reference) = config.test_ref() {
        run_stage(registry, config, "test", reference, &sink)?;
        report.stages_run.push("test".to_string());
    }

    if let Some(reference) = config.eval_ref() {
        let outcome = run_stage(registry, config, "eval", reference, &sink)?;
        report.stages_run.push("eval".to_string());
        report.eval_passed = Some(outcome.unwrap_or(false));
    }

    // Upload decision: a failed eval under `upload_criteria: eval` ends
    // the run successfully, without an artifact. The control plane still
    // hears about it, with update_model unset.
    if config.eval_gates_upload() && report.eval_passed == Some(false) {
        tracing::info!("model did not pass evaluation; not uploading model");
        send_report(reporter, opts, false, &mut report).await;
        report.duration_secs = started.elapsed().as_secs_f64();
        return Ok(report);
    }

    let staged = prepare_artifact(&opts.base_dir, config.model_path(), &opts.remote_key)?;
    tracing::info!(local = %staged.local.display(), key = %staged.key, "uploading trained model");
    store
        .put(&staged.local, &staged.key)
        .await
        .map_err(PipelineError::Upload)?;
    report.uploaded = true;
    report.artifact_key = Some(staged.key);

    send_report(reporter, opts, true, &mut report).await;
    report.duration_secs = started.elapsed().as_secs_f64();
    Ok(report)
}

async fn send_report<R: StatusReporter>(
    reporter: &R,
    opts: &RunOptions,
    update_model: bool,
    report: &mut RunReport,
) {
    let payload = TrainedPayload {
        deployment_uid: opts.deployment_uid.clone(),
        update_model,
        with_api_deploy: opts.with_api_deploy,
    };

    match reporter.report_trained(&payload).await {
        Ok(()) => {
            report.reported = true;
            tracing::info!(
                deployment = %payload.deployment_uid,
                update_model,
                "reported training completion"
            );
        }
        Err(error) => {
            // The run already succeeded; a reporting failure must not mask that.
            report.reported = false;
            tracing::warn!(%error, "failed to report training completion to the core API");
        }
    }
}

/// Check every configured stage reference against the registry without
/// running anything.
pub fn check_training(config: &TrainingConfig, registry: &Registry) -> CheckReport {
    let refs = [
        ("train", Some(config.train_ref())),
        ("test", config.test_ref()),
        ("eval", config.eval_ref()),
        ("dataset.fetch", config.dataset_fetch_ref()),
        ("dataset.prepro", config.dataset_prepro_ref()),
    ];

    let mut report = CheckReport::default();
    for (stage, reference) in refs {
        let Some(reference) = reference else { continue };
        let (ok, message) = match resolve::resolve(registry, reference, config.ref_syntax) {
            Ok(_) => (true, String::new()),
            Err(e) => (false, e.to_string()),
        };
        report.refs.push(RefCheck {
            stage: stage.to_string(),
            reference: reference.to_string(),
            ok,
            message,
        });
    }
    report
}
