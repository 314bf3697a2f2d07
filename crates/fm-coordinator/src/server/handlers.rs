//! HTTP request handlers
//!
//! Thin translation layer: parse, validate, delegate to the state
//! components, shape the response. Peer addresses are optional because the
//! router is also driven directly in tests, without a connected socket.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::Json;

use fm_core::DeviceId;
use fm_protocol::{
    CommandKind, DeviceView, PowerRequest, StatusResponse, SyncRequest, SyncResponse,
    TelemetryReport, TelemetryResponse, TerminalInputRequest, TerminalOutputResponse,
    TerminalStartResponse, UpdateExecuteRequest, UpdateRepoRequest, UpdateStatus,
};

use crate::mailbox::PendingCommand;
use crate::server::error::ApiError;
use crate::state::CoordinatorState;

fn require_id(id: &str) -> Result<DeviceId, ApiError> {
    let id = DeviceId::new(id);
    if !id.is_valid() {
        return Err(ApiError::InvalidRequest(
            "device id is required".to_string(),
        ));
    }
    Ok(id)
}

/// `POST /api/telemetry`: ingest a report and hand back whatever command
/// was waiting in the device's mailbox.
pub async fn post_telemetry(
    State(state): State<CoordinatorState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(report): Json<TelemetryReport>,
) -> Result<Json<TelemetryResponse>, ApiError> {
    let id = require_id(&report.id)?;
    state
        .registry
        .ingest(&report, peer.map(|ConnectInfo(addr)| addr.ip()));

    let mut response = TelemetryResponse::ack();
    if let Some(command) = state.mailbox.drain(&id) {
        tracing::info!("Delivering {:?} to {}", command, id);
        match command {
            PendingCommand::Reboot => response.command = Some(CommandKind::Reboot),
            PendingCommand::Shutdown => response.command = Some(CommandKind::Shutdown),
            PendingCommand::Update { repo_url, token } => {
                response.command = Some(CommandKind::Update);
                response.repo_url = Some(repo_url);
                response.token = token;
            }
        }
    }

    Ok(Json(response))
}

/// `GET /api/devices`: snapshot of every known device with derived status.
pub async fn get_devices(State(state): State<CoordinatorState>) -> Json<Vec<DeviceView>> {
    Json(state.registry.snapshot())
}

/// `POST /api/devices/power`: queue a reboot or shutdown for a device.
pub async fn post_power(
    State(state): State<CoordinatorState>,
    Json(request): Json<PowerRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = require_id(&request.id)?;
    tracing::info!("Queueing {} for {}", request.action, id);
    state.mailbox.enqueue(id, request.action.into());
    Ok(Json(StatusResponse::queued()))
}

/// `POST /api/terminal/{identity}/start`: open a fresh session, replacing
/// any live one.
pub async fn post_terminal_start(
    State(state): State<CoordinatorState>,
    Path(identity): Path<String>,
) -> Result<Json<TerminalStartResponse>, ApiError> {
    let id = require_id(&identity)?;
    let mode = state.terminals.start(&id).await;
    Ok(Json(TerminalStartResponse {
        status: "ok".to_string(),
        mode,
    }))
}

/// `POST /api/terminal/{identity}/input`: queue viewer keystrokes.
pub async fn post_terminal_input(
    State(state): State<CoordinatorState>,
    Path(identity): Path<String>,
    Json(request): Json<TerminalInputRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = require_id(&identity)?;
    state.terminals.write_input(&id, request.data);
    Ok(Json(StatusResponse::ok()))
}

/// `GET /api/terminal/{identity}/output`: drain pending session output.
pub async fn get_terminal_output(
    State(state): State<CoordinatorState>,
    Path(identity): Path<String>,
) -> Result<Json<TerminalOutputResponse>, ApiError> {
    let id = require_id(&identity)?;
    let output = state.terminals.read_output(&id).await;
    Ok(Json(TerminalOutputResponse { output }))
}

/// `POST /api/terminal/sync`: one relay exchange driven by the device.
pub async fn post_terminal_sync(
    State(state): State<CoordinatorState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, ApiError> {
    let id = require_id(&request.id)?;
    let input = state.terminals.sync(&id, request.output);
    Ok(Json(SyncResponse { input }))
}

/// `GET /api/update/check`: current update source settings.
pub async fn get_update_check(State(state): State<CoordinatorState>) -> Json<UpdateStatus> {
    Json(state.updates.check())
}

/// `POST /api/update/repo`: set the update source.
pub async fn post_update_repo(
    State(state): State<CoordinatorState>,
    Json(request): Json<UpdateRepoRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if request.url.is_empty() {
        return Err(ApiError::InvalidRequest(
            "repository url is required".to_string(),
        ));
    }
    tracing::info!("Update source set to {}", request.url);
    state.updates.set_repo(request.url, request.token);
    Ok(Json(StatusResponse::ok()))
}

/// `POST /api/update/execute`: queue an update command for a device.
pub async fn post_update_execute(
    State(state): State<CoordinatorState>,
    Json(request): Json<UpdateExecuteRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = require_id(&request.id)?;
    let command = state.updates.command().ok_or_else(|| {
        ApiError::InvalidRequest("no update repository configured".to_string())
    })?;

    tracing::info!("Queueing update for {}", id);
    state.mailbox.enqueue(id, command);
    Ok(Json(StatusResponse::queued()))
}
