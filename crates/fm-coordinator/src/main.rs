//! FleetMon coordinator daemon
//!
//! Runs the HTTP control plane agents poll against: device registry,
//! command mailbox, terminal session manager, and the self-telemetry
//! sampler for the coordinator's own host.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fm_core::config::{self, CoordinatorConfig};
use fm_coordinator::{sampler, server, CoordinatorState};

#[derive(Parser)]
#[command(name = "fm-coordinator")]
#[command(about = "FleetMon coordinator daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

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

    tracing::info!("FleetMon coordinator starting...");

    let mut config = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_dir().join("coordinator.toml");
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                CoordinatorConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            CoordinatorConfig::default()
        }
    };

    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    let state = CoordinatorState::new(config);
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

    let sampler_task = if state.config.self_telemetry {
        Some(tokio::spawn(sampler::run(state.clone(), cancel.clone())))
    } else {
        None
    };

    server::run(state, cancel).await?;

    if let Some(task) = sampler_task {
        let _ = task.await;
    }

    tracing::info!("Coordinator shutdown complete");
    Ok(())
}
