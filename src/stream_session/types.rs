//! Stream session type definitions

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Playlist file written by the transcoder in each camera directory
pub const PLAYLIST_NAME: &str = "stream.m3u8";

/// Playback URL published for a camera
pub fn hls_url(camera_id: &str) -> String {
    format!("/{}/{}", camera_id, PLAYLIST_NAME)
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Registered, transcoder not yet attached
    Starting,
    Running,
    /// Removed from the registry, termination requested
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    Started,
    AlreadyRunning,
}

/// Result of a start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartResponse {
    pub status: StartStatus,
    pub hls_url: String,
}

impl StartResponse {
    pub fn started(hls_url: String) -> Self {
        Self {
            status: StartStatus::Started,
            hls_url,
        }
    }

    pub fn already_running(hls_url: String) -> Self {
        Self {
            status: StartStatus::AlreadyRunning,
            hls_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStatus {
    Stopped,
}

/// Result of a stop request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopResponse {
    pub status: StopStatus,
}

impl StopResponse {
    pub fn stopped() -> Self {
        Self {
            status: StopStatus::Stopped,
        }
    }
}

/// Stream status for one camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub active: bool,
    pub hls_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<SessionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl StreamStatus {
    pub fn inactive() -> Self {
        Self {
            active: false,
            hls_url: None,
            state: None,
            started_at: None,
        }
    }
}

/// Snapshot of an active session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub camera_id: String,
    pub session_id: Uuid,
    pub hls_url: String,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub pid: Option<u32>,
}

impl From<&SessionInfo> for StreamStatus {
    fn from(info: &SessionInfo) -> Self {
        Self {
            active: true,
            hls_url: Some(info.hls_url.clone()),
            state: Some(info.state),
            started_at: Some(info.started_at),
        }
    }
}

/// Transcoder launch settings
#[derive(Debug, Clone)]
pub struct TranscodeProfile {
    /// ffmpeg executable
    pub program: PathBuf,
    /// HLS segment duration in seconds
    pub segment_seconds: u32,
    /// Segments kept in the rolling playlist
    pub list_size: u32,
    /// Time allowed for a graceful quit before the process is killed
    pub stop_grace: Duration,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            segment_seconds: 1,
            list_size: 3,
            stop_grace: Duration::from_secs(3),
        }
    }
}

/// One transcoder invocation
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub camera_id: String,
    pub source_url: String,
    pub output_dir: PathBuf,
}

impl TranscodeJob {
    pub fn playlist_path(&self) -> PathBuf {
        self.output_dir.join(PLAYLIST_NAME)
    }

    pub fn segment_pattern(&self) -> PathBuf {
        self.output_dir.join("segment_%05d.ts")
    }
}

/// How a transcoder process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// Process exited; code is None when killed by a signal
    Exited { code: Option<i32> },
    /// Exit could not be observed
    Lost(String),
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessExit::Exited { code: Some(code) } => write!(f, "exited with code {}", code),
            ProcessExit::Exited { code: None } => write!(f, "terminated by signal"),
            ProcessExit::Lost(reason) => write!(f, "exit not observed: {}", reason),
        }
    }
}
