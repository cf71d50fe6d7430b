//! End-to-end tests for the training orchestrator, using in-memory
//! collaborators: a capturing log sink, artifact store, and reporter.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use trainpack_engine::config::parser::parse_training_str;
use trainpack_engine::config::validator::validate_training;
use trainpack_engine::env::EnvSpec;
use trainpack_engine::errors::PipelineError;
use trainpack_engine::orchestrator::{run_training, RunOptions};
use trainpack_engine::report::{StatusReporter, TrainedPayload};
use trainpack_engine::upload::ArtifactStore;
use trainpack_sdk::{LogLevel, MemoryLogSink, Registry};

#[derive(Default)]
struct MemoryStore {
    puts: Mutex<Vec<(PathBuf, String)>>,
}

impl MemoryStore {
    fn puts(&self) -> Vec<(PathBuf, String)> {
        self.puts.lock().unwrap().clone()
    }
}

impl ArtifactStore for MemoryStore {
    async fn put(&self, local: &Path, key: &str) -> anyhow::Result<()> {
        self.puts
            .lock()
            .unwrap()
            .push((local.to_path_buf(), key.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct MemoryReporter {
    payloads: Mutex<Vec<TrainedPayload>>,
    fail: bool,
}

impl MemoryReporter {
    fn failing() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn payloads(&self) -> Vec<TrainedPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

impl StatusReporter for MemoryReporter {
    async fn report_trained(&self, payload: &TrainedPayload) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("core API unreachable");
        }
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

fn options(base_dir: &Path) -> RunOptions {
    RunOptions {
        base_dir: base_dir.to_path_buf(),
        remote_key: "models/deploy-1".to_string(),
        deployment_uid: "deploy-1".to_string(),
        with_api_deploy: false,
    }
}

/// Registry whose train stage writes `model.h5` under `base_dir`.
fn training_registry(base_dir: &Path) -> Registry {
    let artifact = base_dir.join("model.h5");
    let mut registry = Registry::new();
    registry.register("models.resnet", "train", move |io| {
        std::fs::write(&artifact, b"weights")?;
        writeln!(io.out(), "training finished")?;
        Ok(None)
    });
    registry
}

#[tokio::test]
async fn test_scenario_a_minimal_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
model:
  path: model.h5
"#,
    )
    .unwrap();
    validate_training(&config).unwrap();

    let registry = training_registry(dir.path());
    let sink = MemoryLogSink::new();
    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();

    let report = run_training(
        &config,
        &registry,
        Arc::new(sink),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap();

    assert_eq!(report.stages_run, vec!["train"]);
    assert_eq!(report.eval_passed, None);
    assert!(report.uploaded);
    assert_eq!(report.artifact_key.as_deref(), Some("models/deploy-1.h5"));
    assert!(report.reported);

    let puts = store.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, dir.path().join("model.h5"));
    assert_eq!(puts[0].1, "models/deploy-1.h5");

    let payloads = reporter.payloads();
    assert_eq!(payloads.len(), 1);
    assert!(payloads[0].update_model);
    assert_eq!(payloads[0].deployment_uid, "deploy-1");
}

#[tokio::test]
async fn test_scenario_b_eval_gate_stops_upload() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
eval: "models.resnet:eval"
model:
  path: model.h5
  upload_criteria: eval
"#,
    )
    .unwrap();
    validate_training(&config).unwrap();

    let mut registry = training_registry(dir.path());
    registry.register("models.resnet", "eval", |_io| Ok(Some(false)));

    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();

    let report = run_training(
        &config,
        &registry,
        Arc::new(MemoryLogSink::new()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap();

    assert_eq!(report.stages_run, vec!["train", "eval"]);
    assert_eq!(report.eval_passed, Some(false));
    assert!(!report.uploaded);
    assert_eq!(report.artifact_key, None);
    assert!(store.puts().is_empty());

    // Documented policy: the skip is still reported, with update_model unset.
    let payloads = reporter.payloads();
    assert_eq!(payloads.len(), 1);
    assert!(!payloads[0].update_model);
    assert!(report.reported);
}

#[tokio::test]
async fn test_eval_returning_no_value_fails_the_gate() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
eval: "models.resnet:eval"
model:
  path: model.h5
  upload_criteria: eval
"#,
    )
    .unwrap();

    let mut registry = training_registry(dir.path());
    registry.register("models.resnet", "eval", |_io| Ok(None));

    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();

    let report = run_training(
        &config,
        &registry,
        Arc::new(MemoryLogSink::new()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap();

    assert_eq!(report.eval_passed, Some(false));
    assert!(!report.uploaded);
    assert!(store.puts().is_empty());
}

#[tokio::test]
async fn test_failed_eval_without_gate_still_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
eval: "models.resnet:eval"
model:
  path: model.h5
"#,
    )
    .unwrap();

    let mut registry = training_registry(dir.path());
    registry.register("models.resnet", "eval", |_io| Ok(Some(false)));

    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();

    let report = run_training(
        &config,
        &registry,
        Arc::new(MemoryLogSink::new()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap();

    assert_eq!(report.eval_passed, Some(false));
    assert!(report.uploaded);
    assert_eq!(store.puts().len(), 1);
}

#[tokio::test]
async fn test_scenario_c_directory_artifact_zipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
model:
  path: saved_model
"#,
    )
    .unwrap();

    let model_dir = dir.path().join("saved_model");
    let mut registry = Registry::new();
    registry.register("models.resnet", "train", move |_io| {
        std::fs::create_dir_all(&model_dir)?;
        std::fs::write(model_dir.join("saved_model.pb"), b"graph")?;
        Ok(None)
    });

    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();

    let report = run_training(
        &config,
        &registry,
        Arc::new(MemoryLogSink::new()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap();

    assert_eq!(report.artifact_key.as_deref(), Some("models/deploy-1.zip"));
    let puts = store.puts();
    assert_eq!(puts[0].0, dir.path().join("saved_model.zip"));
    assert!(puts[0].0.exists());
    assert_eq!(puts[0].1, "models/deploy-1.zip");
}

#[tokio::test]
async fn test_all_configured_stages_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "m:train"
test: "m:test"
eval: "m:eval"
dataset:
  fetch: "m:fetch"
  prepro: "m:prepro"
model:
  path: model.h5
"#,
    )
    .unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut registry = Registry::new();
    for name in ["fetch", "prepro", "test", "eval"] {
        let order = Arc::clone(&order);
        registry.register("m", name, move |_io| {
            order.lock().unwrap().push(name);
            Ok(Some(true))
        });
    }
    let artifact = dir.path().join("model.h5");
    let order_train = Arc::clone(&order);
    registry.register("m", "train", move |_io| {
        order_train.lock().unwrap().push("train");
        std::fs::write(&artifact, b"weights")?;
        Ok(None)
    });

    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();
    let report = run_training(
        &config,
        &registry,
        Arc::new(MemoryLogSink::new()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["fetch", "prepro", "train", "test", "eval"]
    );
    assert_eq!(
        report.stages_run,
        vec!["fetch dataset", "preprocess dataset", "train", "test", "eval"]
    );
    assert_eq!(report.eval_passed, Some(true));
}

#[tokio::test]
async fn test_stage_failure_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
model:
  path: model.h5
"#,
    )
    .unwrap();

    let mut registry = Registry::new();
    registry.register("models.resnet", "train", |_io| {
        anyhow::bail!("CUDA out of memory")
    });

    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();

    let err = run_training(
        &config,
        &registry,
        Arc::new(MemoryLogSink::new()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap_err();

    match err {
        PipelineError::Stage { stage, source } => {
            assert_eq!(stage, "train");
            assert!(source.to_string().contains("CUDA out of memory"));
        }
        other => panic!("expected stage error, got: {other}"),
    }
    assert!(store.puts().is_empty());
    assert!(reporter.payloads().is_empty());
}

#[tokio::test]
async fn test_unresolvable_reference_aborts_before_upload() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
test: "models.resnet:test"
model:
  path: model.h5
"#,
    )
    .unwrap();

    // train resolves, test does not
    let registry = training_registry(dir.path());
    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();

    let err = run_training(
        &config,
        &registry,
        Arc::new(MemoryLogSink::new()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Resolve(_)));
    assert!(err.to_string().contains("test"));
    assert!(store.puts().is_empty());
}

#[tokio::test]
async fn test_missing_artifact_is_fatal_before_upload() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
model:
  path: never/created.h5
"#,
    )
    .unwrap();

    let mut registry = Registry::new();
    registry.register("models.resnet", "train", |_io| Ok(None));

    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();

    let err = run_training(
        &config,
        &registry,
        Arc::new(MemoryLogSink::new()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::MissingArtifact(_)));
    assert!(store.puts().is_empty());
    assert!(reporter.payloads().is_empty());
}

#[tokio::test]
async fn test_report_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
model:
  path: model.h5
"#,
    )
    .unwrap();

    let registry = training_registry(dir.path());
    let store = MemoryStore::default();
    let reporter = MemoryReporter::failing();

    let report = run_training(
        &config,
        &registry,
        Arc::new(MemoryLogSink::new()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap();

    assert!(report.uploaded);
    assert!(!report.reported);
}

#[tokio::test]
async fn test_stage_output_reaches_log_sink_tagged() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse_training_str(
        r#"
train: "models.resnet:train"
model:
  path: model.h5
"#,
    )
    .unwrap();

    let artifact = dir.path().join("model.h5");
    let mut registry = Registry::new();
    registry.register("models.resnet", "train", move |io| {
        std::fs::write(&artifact, b"weights")?;
        writeln!(io.out(), "epoch 1: loss 0.42")?;
        writeln!(io.err(), "learning rate clipped")?;
        Ok(None)
    });

    let sink = MemoryLogSink::new();
    let store = MemoryStore::default();
    let reporter = MemoryReporter::default();

    run_training(
        &config,
        &registry,
        Arc::new(sink.clone()),
        &store,
        &reporter,
        &options(dir.path()),
    )
    .await
    .unwrap();

    let records = sink.records();
    let epoch = records
        .iter()
        .find(|r| r.text.contains("epoch 1"))
        .expect("stdout line forwarded");
    assert_eq!(epoch.stage, "train");
    assert_eq!(epoch.level, LogLevel::Info);

    let clipped = records
        .iter()
        .find(|r| r.text.contains("learning rate clipped"))
        .expect("stderr line forwarded");
    assert_eq!(clipped.level, LogLevel::Error);
}

#[test]
fn test_scenario_d_missing_env_reported_in_one_error() {
    let spec = EnvSpec::new()
        .downstream("TP_E2E_REDIS_ADDRESS")
        .downstream("TP_E2E_LOG_STREAM_KEY")
        .validate_only("TP_E2E_AWS_ACCESS_KEY_ID");

    let err = spec.load().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("TP_E2E_REDIS_ADDRESS"));
    assert!(msg.contains("TP_E2E_LOG_STREAM_KEY"));
    assert!(msg.contains("TP_E2E_AWS_ACCESS_KEY_ID"));
}
