//! HTTP server
//!
//! One axum router over the shared coordinator state. Devices and viewers
//! use the same surface; nothing here authenticates, the coordinator is
//! expected to sit on a trusted network.

mod error;
mod handlers;

pub use error::ApiError;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::state::CoordinatorState;

/// Build the API router over the given state.
pub fn build_router(state: CoordinatorState) -> Router {
    Router::new()
        .route("/api/telemetry", post(handlers::post_telemetry))
        .route("/api/devices", get(handlers::get_devices))
        .route("/api/devices/power", post(handlers::post_power))
        .route(
            "/api/terminal/:identity/start",
            post(handlers::post_terminal_start),
        )
        .route(
            "/api/terminal/:identity/input",
            post(handlers::post_terminal_input),
        )
        .route(
            "/api/terminal/:identity/output",
            get(handlers::get_terminal_output),
        )
        .route("/api/terminal/sync", post(handlers::post_terminal_sync))
        .route("/api/update/check", get(handlers::get_update_check))
        .route("/api/update/repo", post(handlers::post_update_repo))
        .route("/api/update/execute", post(handlers::post_update_execute))
        .with_state(state)
}

/// Bind and serve until the token is cancelled.
pub async fn run(state: CoordinatorState, cancel: CancellationToken) -> anyhow::Result<()> {
    let bind_address = state.config.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Listening on {}", bind_address);

    let router = build_router(state)
        .into_make_service_with_connect_info::<std::net::SocketAddr>();

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
