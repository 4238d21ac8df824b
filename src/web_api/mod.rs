//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes for stream sessions and camera control
//! - HLS playlist/segment serving from the output root
//! - Response formatting

mod ptz_routes;
mod routes;
mod stream_routes;

pub use routes::create_router;

use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "cameras": state.cameras.len(),
        "active_streams": state.streams.list().len(),
    }))
}

/// Content type for an HLS artifact path
pub fn hls_content_type(path: &str) -> Option<&'static str> {
    if path.ends_with(".m3u8") {
        Some("application/vnd.apple.mpegurl")
    } else if path.ends_with(".ts") {
        Some("video/mp2t")
    } else {
        None
    }
}

/// Playlist and segments change every few seconds; players must not cache them
async fn hls_headers(request: Request, next: Next) -> Response {
    let content_type = hls_content_type(request.uri().path());
    let mut response = next.run(request).await;

    if response.status().is_success() {
        let headers = response.headers_mut();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    }

    response
}
