//! Relay handlers - status, start/stop, paths, config and logs.

use axum::Json;
use axum::extract::State;
use stagehand_core::{PathList, RelayLogEntry, RelayProcessConfig, RelayStatus};
use stagehand_runtime::{StartOutcome, StopOutcome};
use tracing::info;

use crate::error::{ApiResponse, HttpError};
use crate::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, HttpError>;

/// Combined supervisor and relay status.
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<RelayStatus>> {
    ApiResponse::ok(state.supervisor.status().await)
}

/// Start the relay. A relay that is already running is left alone.
pub async fn start(State(state): State<AppState>) -> ApiResult<RelayStatus> {
    let message = match state.supervisor.start().await? {
        StartOutcome::Started(_) => "MediaMTX server started",
        StartOutcome::AlreadyRunning(_) => "Server already running",
    };
    info!(%message, "Relay start requested");
    Ok(ApiResponse::with_message(
        state.supervisor.status().await,
        message,
    ))
}

/// Stop the relay. Succeeds whether or not it was running.
pub async fn stop(State(state): State<AppState>) -> ApiResult<RelayStatus> {
    let message = match state.supervisor.stop().await? {
        StopOutcome::Stopped => "MediaMTX server stopped",
        StopOutcome::NotRunning => "Server was not running",
    };
    Ok(ApiResponse::with_message(
        state.supervisor.status().await,
        message,
    ))
}

/// Publish paths reported by the relay.
///
/// The control API is only asked when the relay is running, so "not
/// running" and "running but unreachable" stay distinguishable.
pub async fn paths(State(state): State<AppState>) -> ApiResult<PathList> {
    if !state.supervisor.is_running() {
        return Err(HttpError::RelayNotRunning);
    }

    let paths = state
        .supervisor
        .get_active_paths()
        .await
        .ok_or(HttpError::ControlApiUnreachable)?;
    Ok(ApiResponse::ok(paths))
}

pub async fn config(State(state): State<AppState>) -> Json<ApiResponse<RelayProcessConfig>> {
    ApiResponse::ok(state.supervisor.get_config().clone())
}

/// Captured relay output, oldest first.
pub async fn logs(State(state): State<AppState>) -> Json<ApiResponse<Vec<RelayLogEntry>>> {
    ApiResponse::ok(state.supervisor.logs())
}

pub async fn clear_logs(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    state.supervisor.clear_logs();
    ApiResponse::with_message((), "Relay logs cleared")
}
