//! PTZ Controller Service
//!
//! Issues VAPIX CGI commands to a camera's embedded web server through the
//! Digest client.

use super::types::*;
use crate::config_store::{Camera, CameraDirectory};
use crate::digest_auth::{Credentials, DigestAuthClient, DigestRequest};
use crate::error::{Error, Result};
use std::sync::Arc;

const PTZ_CGI: &str = "/axis-cgi/com/ptz.cgi";
const RESTART_CGI: &str = "/axis-cgi/restart.cgi";

/// Camera PTZ and reboot control
pub struct PtzService {
    cameras: Arc<CameraDirectory>,
    client: DigestAuthClient,
    /// Used when a camera has no credentials of its own
    default_credentials: Credentials,
}

impl PtzService {
    pub fn new(
        cameras: Arc<CameraDirectory>,
        client: DigestAuthClient,
        default_credentials: Credentials,
    ) -> Self {
        Self {
            cameras,
            client,
            default_credentials,
        }
    }

    /// Move in a direction (one step, or continuously until stopped)
    pub async fn move_ptz(&self, camera_id: &str, request: &PtzMoveRequest) -> Result<PtzResponse> {
        let camera = self.ptz_camera(camera_id)?;
        let direction = request.direction.apply_rotation(camera.rotation);

        let query = match request.mode {
            PtzMode::Nudge => format!("move={}", direction.as_str()),
            PtzMode::Continuous => {
                let speed = (request.speed.clamp(0.0, 1.0) * 100.0).round() as i32;
                let (pan, tilt) = direction.vector();
                format!("continuouspantiltmove={},{}", pan * speed, tilt * speed)
            }
        };

        self.send_command(camera, &format!("{}?{}", PTZ_CGI, query), "move")
            .await?;

        tracing::info!(
            camera_id = %camera_id,
            direction = direction.as_str(),
            mode = ?request.mode,
            "PTZ move sent"
        );

        Ok(PtzResponse::success_with_message(format!(
            "moving {}",
            direction.as_str()
        )))
    }

    /// Stop continuous movement
    pub async fn stop_ptz(&self, camera_id: &str) -> Result<PtzResponse> {
        let camera = self.ptz_camera(camera_id)?;
        self.send_command(camera, &format!("{}?continuouspantiltmove=0,0", PTZ_CGI), "stop")
            .await?;
        Ok(PtzResponse::success())
    }

    /// Return to the home position
    pub async fn go_home(&self, camera_id: &str) -> Result<PtzResponse> {
        let camera = self.ptz_camera(camera_id)?;
        self.send_command(camera, &format!("{}?move=home", PTZ_CGI), "home")
            .await?;
        Ok(PtzResponse::success())
    }

    /// Relative zoom
    pub async fn zoom(&self, camera_id: &str, request: &PtzZoomRequest) -> Result<PtzResponse> {
        if request.step == 0 {
            return Err(Error::Validation("zoom step must not be 0".to_string()));
        }

        let camera = self.ptz_camera(camera_id)?;
        self.send_command(camera, &format!("{}?rzoom={}", PTZ_CGI, request.step), "zoom")
            .await?;
        Ok(PtzResponse::success())
    }

    /// Reboot the camera
    pub async fn reboot(&self, camera_id: &str) -> Result<PtzResponse> {
        let camera = self.control_camera(camera_id)?;
        self.send_command(camera, RESTART_CGI, "reboot").await?;

        tracing::info!(camera_id = %camera_id, "Camera reboot requested");
        Ok(PtzResponse::success_with_message("rebooting"))
    }

    fn control_camera(&self, camera_id: &str) -> Result<&Camera> {
        let camera = self
            .cameras
            .get(camera_id)
            .ok_or_else(|| Error::NotFound(camera_id.to_string()))?;

        if camera.control_url.is_none() {
            return Err(Error::Validation(format!(
                "camera {} has no control endpoint",
                camera_id
            )));
        }

        Ok(camera)
    }

    fn ptz_camera(&self, camera_id: &str) -> Result<&Camera> {
        let camera = self.control_camera(camera_id)?;

        if !camera.ptz {
            return Err(Error::Validation(format!(
                "camera {} does not support PTZ",
                camera_id
            )));
        }

        Ok(camera)
    }

    /// Send `path_and_query` to the camera; non-2xx becomes `UpstreamStatus`
    async fn send_command(&self, camera: &Camera, path_and_query: &str, action: &str) -> Result<()> {
        let base = camera.control_url.as_deref().unwrap_or_default();
        let url = format!("{}{}", base.trim_end_matches('/'), path_and_query);

        tracing::debug!(
            camera_id = %camera.camera_id,
            url = %url,
            action = %action,
            "Sending camera command"
        );

        let request = DigestRequest::get(&url)?;
        let credentials = camera.control_credentials(&self.default_credentials);
        let response = self
            .client
            .authenticated_request(&request, &credentials)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                camera_id = %camera.camera_id,
                status = %status,
                body = %body,
                action = %action,
                "Camera command failed"
            );
            return Err(Error::UpstreamStatus {
                url,
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
