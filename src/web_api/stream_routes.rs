//! Stream session API routes

use crate::config_store::CameraSummary;
use crate::error::Result;
use crate::state::AppState;
use crate::stream_session::{SessionInfo, StartResponse, StopResponse, StreamStatus};
use axum::{
    extract::{Path, State},
    Json,
};

/// GET /api/cameras
pub async fn list_cameras(State(state): State<AppState>) -> Json<Vec<CameraSummary>> {
    Json(state.cameras.list().map(|c| c.summary()).collect())
}

/// GET /api/streams
pub async fn list_streams(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    Json(state.streams.list())
}

/// POST /api/cameras/:id/stream/start
pub async fn start_stream(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<Json<StartResponse>> {
    let response = state.streams.start(&camera_id).await?;
    Ok(Json(response))
}

/// POST /api/cameras/:id/stream/stop
pub async fn stop_stream(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<Json<StopResponse>> {
    let response = state.streams.stop(&camera_id)?;
    Ok(Json(response))
}

/// GET /api/cameras/:id/stream
pub async fn stream_status(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Json<StreamStatus> {
    Json(state.streams.status(&camera_id))
}
