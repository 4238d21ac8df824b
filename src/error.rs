//! Error handling for the camera stream server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown camera identifier
    #[error("Camera not found: {0}")]
    NotFound(String),

    /// No stream session for the camera
    #[error("Stream not active for camera {0}")]
    NotActive(String),

    /// Transcoder could not be launched
    #[error("Failed to launch transcoder for camera {camera_id}: {message}")]
    SpawnFailure { camera_id: String, message: String },

    /// Transcoder exited without a stop request
    #[error("Transcoder for camera {camera_id} exited unexpectedly: {message}")]
    ProcessCrash { camera_id: String, message: String },

    /// Malformed or absent Digest challenge
    #[error("Digest protocol error for {url}: {message}")]
    Protocol { url: String, message: String },

    /// Username or password missing
    #[error("Missing credentials for {0}")]
    MissingCredentials(String),

    /// Camera answered with a non-success status
    #[error("Camera responded {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NOT_FOUND",
            Error::NotActive(_) => "NOT_ACTIVE",
            Error::SpawnFailure { .. } => "SPAWN_FAILURE",
            Error::ProcessCrash { .. } => "PROCESS_CRASH",
            Error::Protocol { .. } => "PROTOCOL_ERROR",
            Error::MissingCredentials(_) => "MISSING_CREDENTIALS",
            Error::UpstreamStatus { .. } => "UPSTREAM_STATUS",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) | Error::NotActive(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::MissingCredentials(_) => StatusCode::UNAUTHORIZED,
            Error::Protocol { .. } | Error::UpstreamStatus { .. } | Error::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::SpawnFailure { .. }
            | Error::ProcessCrash { .. }
            | Error::Config(_)
            | Error::Io(_)
            | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.code();
        let message = self.to_string();

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
