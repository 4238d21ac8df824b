//! Camstream Server Library
//!
//! Camera session and control layer: relays RTSP camera streams to browsers
//! as HLS and forwards PTZ/reboot commands to cameras.
//!
//! ## Architecture
//!
//! 1. ConfigStore - Camera directory (id -> connection info)
//! 2. StreamSession - One ffmpeg transcode session per camera
//! 3. DigestAuth - HTTP Digest client for camera control endpoints
//! 4. PtzController - PTZ and reboot commands
//! 5. WebAPI - REST API endpoints and HLS file serving

pub mod config_store;
pub mod digest_auth;
pub mod error;
pub mod ptz_controller;
pub mod state;
pub mod stream_session;
pub mod web_api;

pub use error::{Error, Result};
pub use state::{AppConfig, AppState};
