//! Application state
//!
//! Holds all shared components and state

use crate::config_store::CameraDirectory;
use crate::digest_auth::{Credentials, DigestAuthClient};
use crate::error::Result;
use crate::ptz_controller::PtzService;
use crate::stream_session::{StreamSessionManager, TranscodeProfile};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Camera list (JSON)
    pub cameras_file: PathBuf,
    /// HLS output root, one subdirectory per camera
    pub hls_dir: PathBuf,
    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,
    pub hls_segment_seconds: u32,
    pub hls_list_size: u32,
    /// Graceful quit window before a transcoder is killed
    pub stop_grace: Duration,
    /// Control credentials for cameras without their own
    pub camera_username: Option<String>,
    pub camera_password: Option<String>,
    /// Camera control request timeout
    pub control_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT", 8080),
            cameras_file: std::env::var("CAMERAS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("cameras.json")),
            hls_dir: std::env::var("HLS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./hls")),
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("ffmpeg")),
            hls_segment_seconds: env_parse("HLS_SEGMENT_SECONDS", 1),
            hls_list_size: env_parse("HLS_LIST_SIZE", 3),
            stop_grace: Duration::from_millis(env_parse("STOP_GRACE_MS", 3000)),
            camera_username: std::env::var("CAMERA_USERNAME").ok(),
            camera_password: std::env::var("CAMERA_PASSWORD").ok(),
            control_timeout: Duration::from_secs(env_parse("CONTROL_TIMEOUT_SECS", 10)),
        }
    }
}

impl AppConfig {
    pub fn transcode_profile(&self) -> TranscodeProfile {
        TranscodeProfile {
            program: self.ffmpeg_path.clone(),
            segment_seconds: self.hls_segment_seconds.max(1),
            list_size: self.hls_list_size.max(1),
            stop_grace: self.stop_grace,
        }
    }

    pub fn default_credentials(&self) -> Credentials {
        Credentials {
            username: self.camera_username.clone(),
            password: self.camera_password.clone(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Camera directory (read-only after startup)
    pub cameras: Arc<CameraDirectory>,
    /// StreamSessionManager (ffmpeg -> HLS)
    pub streams: Arc<StreamSessionManager>,
    /// PtzService (camera control over Digest auth)
    pub ptz: Arc<PtzService>,
}

impl AppState {
    /// Wire the production components
    pub fn new(config: AppConfig, cameras: CameraDirectory) -> Result<Self> {
        let cameras = Arc::new(cameras);

        let streams = Arc::new(StreamSessionManager::with_ffmpeg(
            cameras.clone(),
            config.hls_dir.clone(),
            config.transcode_profile(),
        ));

        let ptz = Arc::new(PtzService::new(
            cameras.clone(),
            DigestAuthClient::new(config.control_timeout)?,
            config.default_credentials(),
        ));

        Ok(Self {
            config,
            cameras,
            streams,
            ptz,
        })
    }
}
