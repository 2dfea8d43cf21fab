use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "taskpulse",
    about = "Sidecar-style periodic task runner with health reporting",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (default: $TASKPULSE_CONFIG, then
    /// /etc/taskpulse/taskpulse.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Whether to enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + scheduler loop)
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run the configured task once through the executor and exit
    RunOnce,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = taskpulse::config::Config::load_auto(cli.config.as_deref())?;

    let default_filter = if cli.debug || config.logging.debug {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            tracing::info!(%bind, "Starting taskpulse daemon");
            taskpulse::serve(&bind, config).await?;
        }
        Commands::RunOnce => {
            tracing::info!("Running task once");
            let executor = taskpulse::executor_from_config(&config);
            match executor.invoke().await {
                Ok(()) => println!("task completed successfully"),
                Err(e) => {
                    eprintln!("task failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
