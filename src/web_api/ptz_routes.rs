//! PTZ API Routes
//!
//! Camera control endpoints. Errors are returned as `{error_code, message}`.

use crate::error::Result;
use crate::ptz_controller::{PtzMoveRequest, PtzResponse, PtzZoomRequest};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

/// POST /api/cameras/:id/ptz/move
pub async fn ptz_move(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
    Json(request): Json<PtzMoveRequest>,
) -> Result<Json<PtzResponse>> {
    Ok(Json(state.ptz.move_ptz(&camera_id, &request).await?))
}

/// POST /api/cameras/:id/ptz/stop
pub async fn ptz_stop(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<Json<PtzResponse>> {
    Ok(Json(state.ptz.stop_ptz(&camera_id).await?))
}

/// POST /api/cameras/:id/ptz/home
pub async fn ptz_home(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<Json<PtzResponse>> {
    Ok(Json(state.ptz.go_home(&camera_id).await?))
}

/// POST /api/cameras/:id/ptz/zoom
pub async fn ptz_zoom(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
    Json(request): Json<PtzZoomRequest>,
) -> Result<Json<PtzResponse>> {
    Ok(Json(state.ptz.zoom(&camera_id, &request).await?))
}

/// POST /api/cameras/:id/reboot
pub async fn reboot(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<Json<PtzResponse>> {
    Ok(Json(state.ptz.reboot(&camera_id).await?))
}
