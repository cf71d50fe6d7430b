use tracing_subscriber::EnvFilter;

/// Initialize structured logging.
///
/// Uses the `RUST_LOG` env var if set, otherwise the provided level.
/// Diagnostics go to stderr: stdout belongs to the user's stage
/// functions, whose output the log tee mirrors to the remote channel.
pub fn init(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
