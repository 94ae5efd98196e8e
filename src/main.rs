use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genserve::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.command.config()?;

    // Initialize logging
    let level = &config.server.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("genserve={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { .. } => {
            genserve::cli::serve(config).await?;
        }
        Commands::Generate { .. } => {
            if let Some(request) = cli.command.generation_request() {
                genserve::cli::generate(config, request).await?;
            }
        }
    }

    Ok(())
}
