// Penwright
// Main entry point for the penwright binary

use clap::Parser;
use penwright_engine::cli::{Cli, Command};
use penwright_engine::config::Config;
use penwright_engine::handlers::{
    handle_personas, handle_run, handle_validate, OutputFormat, RunArgs,
};
use penwright_engine::telemetry::{init_telemetry, init_telemetry_with_level};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let loaded = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path),
        None => Config::load_or_create(),
    };

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            init_telemetry();
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // --log wins over the config file; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    tracing::debug!(
        "Penwright v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Run {
            topic,
            pipeline,
            cooldown,
            api_key,
        } => {
            let cancel = CancellationToken::new();
            let token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling run");
                    token.cancel();
                }
            });

            let args = RunArgs {
                topic,
                pipeline,
                cooldown,
                api_key,
            };
            handle_run(args, &config, format, cancel).await
        }

        Command::Validate { pipeline } => {
            handle_validate(pipeline.as_deref(), &config, format).await
        }

        Command::Personas => handle_personas(&config, format).await,
    }
}
