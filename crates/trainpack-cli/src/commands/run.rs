use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use trainpack_engine::config::{parser, validator};
use trainpack_engine::env::{flag_is_set, EnvSpec};
use trainpack_engine::orchestrator::{self, RunOptions};
use trainpack_engine::report::CoreApiClient;
use trainpack_engine::sinks::RedisLogSink;
use trainpack_engine::upload::S3ArtifactStore;
use trainpack_sdk::LogSink;

use crate::plugins;

/// Environment contract of the buildpack binary. The engine takes this
/// as data; only the CLI knows the concrete names.
fn buildpack_env_spec() -> EnvSpec {
    EnvSpec::new()
        .downstream("REDIS_ADDRESS")
        .downstream("REDIS_PASSWORD")
        .downstream("LOG_STREAM_KEY")
        .downstream("MODEL_STORAGE_URL")
        .downstream("MODEL_STORAGE_FILE_PATH")
        .downstream("CORE_URL")
        .downstream("CORE_API_TOKEN")
        .downstream("DEPLOYMENT_UID")
        .validate_only("AWS_ACCESS_KEY_ID")
        .validate_only("AWS_SECRET_ACCESS_KEY")
        .validate_only("AWS_REGION_NAME")
        .validate_only("PROJECT_UID")
        .optional("WITH_API_DEPLOY")
        .optional("DATASET_DB_URL")
        .optional("DATASET_TABLE_NAME")
}

/// Execute the `run` command: load env, parse and validate the config,
/// then drive one training run.
pub async fn execute(config_path: &Path, base_dir: Option<PathBuf>) -> Result<()> {
    // 1. Environment first: fail before any other work, with every
    //    missing name in one message.
    let env = buildpack_env_spec().load()?;

    // 2. Parse + validate the training config
    let config = parser::parse_training(config_path)
        .with_context(|| format!("Failed to load training config: {}", config_path.display()))?;
    validator::validate_training(&config)?;

    tracing::info!(
        config = %config_path.display(),
        train = config.train_ref(),
        "training config validated"
    );

    // 3. Stage registry (user crates are linked in at image build time)
    let registry = plugins::build_registry();

    // 4. Collaborators from the environment
    let sink: Arc<dyn LogSink> = Arc::new(RedisLogSink::connect(
        env.require("redis_address")?,
        env.get("redis_password"),
        env.require("log_stream_key")?,
    )?);
    let store = S3ArtifactStore::from_storage_url(env.require("model_storage_url")?).await?;
    let reporter = CoreApiClient::new(env.require("core_url")?, env.require("core_api_token")?);

    let base_dir = match base_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    let opts = RunOptions {
        base_dir,
        remote_key: env.require("model_storage_file_path")?.to_string(),
        deployment_uid: env.require("deployment_uid")?.to_string(),
        with_api_deploy: flag_is_set(env.get("with_api_deploy")),
    };

    // 5. Run
    let report =
        orchestrator::run_training(&config, &registry, sink, &store, &reporter, &opts).await?;

    println!("Training run '{}' completed.", opts.deployment_uid);
    println!("  Stages run:  {}", report.stages_run.join(", "));
    if let Some(passed) = report.eval_passed {
        println!("  Eval passed: {passed}");
    }
    match &report.artifact_key {
        Some(key) => println!("  Uploaded:    {key}"),
        None => println!("  Uploaded:    no (eval gate)"),
    }
    println!(
        "  Reported:    {}",
        if report.reported { "yes" } else { "no" }
    );
    println!("  Duration:    {:.2}s", report.duration_secs);

    Ok(())
}
