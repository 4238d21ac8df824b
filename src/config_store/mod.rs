//! ConfigStore - Camera Directory
//!
//! ## Responsibilities
//!
//! - Load the camera list (camera id -> connection info) once at startup
//! - Read-only lookups for the stream and control services
//!
//! The file is a JSON object keyed by camera id:
//!
//! ```json
//! {
//!   "lobby": { "name": "Lobby", "url": "rtsp://10.0.0.5/stream1", "group": "1F",
//!              "control_url": "http://10.0.0.5", "username": "root", "password": "pass" }
//! }
//! ```

mod types;

pub use types::*;

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Read-only camera directory
#[derive(Debug, Clone, Default)]
pub struct CameraDirectory {
    cameras: BTreeMap<String, Camera>,
}

impl CameraDirectory {
    /// Load from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("cannot read camera list {}: {}", path.display(), e))
        })?;

        let directory = Self::from_json(&raw)?;

        tracing::info!(
            path = %path.display(),
            cameras = directory.len(),
            "Camera directory loaded"
        );

        Ok(directory)
    }

    /// Parse from a JSON string
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: BTreeMap<String, Camera> = serde_json::from_str(raw)?;
        Self::from_cameras(entries.into_iter().map(|(id, mut camera)| {
            camera.camera_id = id;
            camera
        }))
    }

    /// Build from camera entries (camera_id must be set)
    pub fn from_cameras(cameras: impl IntoIterator<Item = Camera>) -> Result<Self> {
        let mut map = BTreeMap::new();

        for camera in cameras {
            validate_camera_id(&camera.camera_id)?;
            // source_url() also validates the URL
            camera.source_url()?;

            if map.insert(camera.camera_id.clone(), camera).is_some() {
                return Err(Error::Config("duplicate camera id".to_string()));
            }
        }

        Ok(Self { cameras: map })
    }

    pub fn get(&self, camera_id: &str) -> Option<&Camera> {
        self.cameras.get(camera_id)
    }

    /// Cameras ordered by id
    pub fn list(&self) -> impl Iterator<Item = &Camera> {
        self.cameras.values()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

/// Camera ids become output directory names and unescaped URL path
/// segments: ASCII letters, digits, `-`, `_` and `.` only
fn validate_camera_id(camera_id: &str) -> Result<()> {
    let valid = !camera_id.is_empty()
        && camera_id != "."
        && camera_id != ".."
        && camera_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("invalid camera id: {:?}", camera_id)))
    }
}
