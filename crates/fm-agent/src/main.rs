//! FleetMon agent daemon
//!
//! Runs on each monitored device: a telemetry loop posting host metrics to
//! the coordinator and a terminal sync loop bridging relay shell sessions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fm_agent::{poller, terminal};
use fm_core::config::{self, AgentConfig};

#[derive(Parser)]
#[command(name = "fm-agent")]
#[command(about = "FleetMon device agent")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Coordinator base URL (overrides config)
    #[arg(short, long)]
    server: Option<String>,

    /// Device identity (overrides config; defaults to <hostname>-<arch>)
    #[arg(long)]
    identity: Option<String>,

    /// Display name (overrides config; defaults to hostname)
    #[arg(long)]
    name: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("FleetMon agent starting...");

    let mut config = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_dir().join("agent.toml");
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                AgentConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            AgentConfig::default()
        }
    };

    if let Some(server) = args.server {
        config.server_url = server;
    }
    if args.identity.is_some() {
        config.identity = args.identity;
    }
    if args.name.is_some() {
        config.name = args.name;
    }
    let config = Arc::new(config);

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let cancel = CancellationToken::new();

    // Signal handlers drive the shared cancellation token
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    let telemetry = tokio::spawn(poller::run(
        Arc::clone(&config),
        client.clone(),
        cancel.clone(),
    ));
    let sync = tokio::spawn(terminal::run(config, client, cancel));

    let _ = telemetry.await;
    let _ = sync.await;

    tracing::info!("Agent shutdown complete");
    Ok(())
}
