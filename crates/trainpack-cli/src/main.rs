mod commands;
mod logging;
mod plugins;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "trainpack",
    version,
    about = "Config-driven runner for ML training jobs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the training pipeline end-to-end
    Run {
        /// Path to the training config YAML
        #[arg(default_value = ".trainpack.yml")]
        config: PathBuf,
        /// Directory the model path is resolved against (default: cwd)
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
    /// Validate the training config and stage references
    Check {
        /// Path to the training config YAML
        #[arg(default_value = ".trainpack.yml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run { config, base_dir } => commands::run::execute(&config, base_dir).await,
        Commands::Check { config } => commands::check::execute(&config),
    }
}
