//! Egide JWT Server - Main entry point.

use anyhow::Context;
use clap::Parser;
use egide_jwt::Strategy;
use egide_jwt_server::{router, AppState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "egide-jwt-server")]
#[command(about = "Nubster Egide - JWT bearer authentication server")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/egide-jwt.toml", env = "EGIDE_JWT_CONFIG")]
    config: String,

    /// Server bind address
    #[arg(long, default_value = "127.0.0.1:8210", env = "EGIDE_JWT_BIND_ADDRESS")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting Egide JWT server...");
    tracing::info!(config = %cli.config, "Loading configuration");

    let config = ServerConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    let accounts = config.directory.accounts.len();
    let extractors = config.strategy.extractor_summary();
    let state = AppState::from_config(config).context("Invalid strategy configuration")?;

    tracing::info!(
        strategy = state.strategy.name(),
        extractors = %extractors,
        accounts,
        "Strategy ready"
    );

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    tracing::info!("Bind address: {}", cli.bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}
