//! Camera directory data types

use crate::digest_auth::Credentials;
use crate::error::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Camera entry as read from the camera list file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Filled from the map key on load
    #[serde(skip_deserializing, default)]
    pub camera_id: String,
    pub name: String,
    /// RTSP source URL
    pub url: String,
    #[serde(default)]
    pub group: Option<String>,
    /// Base URL of the camera's embedded web server (e.g. http://192.168.1.20)
    #[serde(default)]
    pub control_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Mounting rotation in degrees (0, 90, 180, 270)
    #[serde(default)]
    pub rotation: i32,
    #[serde(default = "default_ptz")]
    pub ptz: bool,
}

fn default_ptz() -> bool {
    true
}

impl Camera {
    /// Source URL handed to the transcoder.
    ///
    /// Credentials configured separately are embedded into the URL unless the
    /// URL already carries a username.
    pub fn source_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.url).map_err(|e| {
            Error::Config(format!("camera {}: invalid url: {}", self.camera_id, e))
        })?;

        if url.username().is_empty() {
            if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
                url.set_username(username).map_err(|_| {
                    Error::Config(format!(
                        "camera {}: url cannot carry credentials",
                        self.camera_id
                    ))
                })?;
                url.set_password(self.password.as_deref()).map_err(|_| {
                    Error::Config(format!(
                        "camera {}: url cannot carry credentials",
                        self.camera_id
                    ))
                })?;
            }
        }

        Ok(url.to_string())
    }

    /// Control credentials, falling back to the server-wide defaults
    pub fn control_credentials(&self, defaults: &Credentials) -> Credentials {
        Credentials {
            username: self
                .username
                .clone()
                .filter(|u| !u.is_empty())
                .or_else(|| defaults.username.clone()),
            password: self
                .password
                .clone()
                .filter(|p| !p.is_empty())
                .or_else(|| defaults.password.clone()),
        }
    }

    pub fn summary(&self) -> CameraSummary {
        CameraSummary {
            camera_id: self.camera_id.clone(),
            name: self.name.clone(),
            group: self.group.clone(),
            ptz: self.ptz && self.control_url.is_some(),
            controllable: self.control_url.is_some(),
        }
    }
}

/// Camera as exposed over the API (no credentials)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSummary {
    pub camera_id: String,
    pub name: String,
    pub group: Option<String>,
    pub ptz: bool,
    pub controllable: bool,
}
