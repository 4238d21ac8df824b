//! StreamSession - per-camera HLS transcode sessions
//!
//! ## Responsibilities
//!
//! - Start/stop/status of one transcoder process per camera
//! - Reconcile the registry when a process exits on its own
//! - Terminate every session on server shutdown
//!
//! ## Design
//!
//! - Registry entry is inserted before the first `.await` of `start`, so a
//!   concurrent start for the same camera sees it and never double-spawns
//! - Exit notifications remove an entry only if it still belongs to the
//!   process that exited
//! - No automatic restart: a new `start` is required after a crash

mod registry;
mod transcoder;
mod types;

pub use registry::{Reservation, ReservationGuard, Session, SessionRegistry};
pub use transcoder::{
    wait_for_exit, FfmpegLauncher, ProcessControl, ProcessHandle, TranscodeLauncher,
};
pub use types::*;

use crate::config_store::CameraDirectory;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Extra wait on shutdown beyond the stop grace, covering the kill path
const SHUTDOWN_MARGIN: Duration = Duration::from_secs(1);

/// Supervises transcoder processes, one per camera
pub struct StreamSessionManager {
    cameras: Arc<CameraDirectory>,
    launcher: Arc<dyn TranscodeLauncher>,
    output_root: PathBuf,
    registry: Arc<SessionRegistry>,
    stop_grace: Duration,
}

impl StreamSessionManager {
    pub fn new(
        cameras: Arc<CameraDirectory>,
        launcher: Arc<dyn TranscodeLauncher>,
        output_root: PathBuf,
        stop_grace: Duration,
    ) -> Self {
        Self {
            cameras,
            launcher,
            output_root,
            registry: Arc::new(SessionRegistry::new()),
            stop_grace,
        }
    }

    /// ffmpeg-backed manager
    pub fn with_ffmpeg(
        cameras: Arc<CameraDirectory>,
        output_root: PathBuf,
        profile: TranscodeProfile,
    ) -> Self {
        let stop_grace = profile.stop_grace;
        Self::new(
            cameras,
            Arc::new(FfmpegLauncher::new(profile)),
            output_root,
            stop_grace,
        )
    }

    /// Start streaming a camera.
    ///
    /// Idempotent: returns `already_running` with the existing URL when a
    /// session exists. Returns as soon as the transcoder is spawned.
    ///
    /// Fails with `NotActive` when `stop` removed the session before the
    /// transcoder was attached; the spawned process is terminated. If the
    /// returned future is dropped before completion, the reservation is
    /// released.
    pub async fn start(&self, camera_id: &str) -> Result<StartResponse> {
        let camera = self
            .cameras
            .get(camera_id)
            .ok_or_else(|| Error::NotFound(camera_id.to_string()))?;
        let source_url = camera.source_url()?;
        let output_dir = self.output_root.join(camera_id);
        let url = hls_url(camera_id);

        let session = Session::new(camera_id, source_url.clone(), output_dir.clone(), url.clone());
        let session_id = match self.registry.reserve(session) {
            Reservation::Reserved(id) => id,
            Reservation::Existing { hls_url } => {
                tracing::debug!(camera_id = %camera_id, "Stream already running");
                return Ok(StartResponse::already_running(hls_url));
            }
        };
        let reservation = ReservationGuard::new(&self.registry, camera_id, session_id);

        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            return Err(Error::SpawnFailure {
                camera_id: camera_id.to_string(),
                message: format!("cannot create {}: {}", output_dir.display(), e),
            });
        }

        let job = TranscodeJob {
            camera_id: camera_id.to_string(),
            source_url,
            output_dir,
        };

        let process = match self.launcher.launch(&job) {
            Ok(process) => process,
            Err(e) => {
                let err = Error::SpawnFailure {
                    camera_id: camera_id.to_string(),
                    message: e.to_string(),
                };
                tracing::error!(camera_id = %camera_id, error = %err, "Transcoder launch failed");
                return Err(err);
            }
        };

        let pid = process.pid();
        let exit = process.exit_watch();

        if let Err(mut orphan) = self.registry.attach(camera_id, session_id, process) {
            // stop() ran while the session was Starting
            orphan.terminate();
            tracing::info!(camera_id = %camera_id, "Stream stopped during startup");
            return Err(Error::NotActive(camera_id.to_string()));
        }
        reservation.disarm();

        self.reconcile_on_exit(camera_id.to_string(), session_id, exit);

        tracing::info!(
            camera_id = %camera_id,
            session_id = %session_id,
            pid = ?pid,
            hls_url = %url,
            "Stream session started"
        );

        Ok(StartResponse::started(url))
    }

    /// Stop a camera's stream.
    ///
    /// Removes the entry immediately and requests termination without
    /// waiting for the process to exit.
    pub fn stop(&self, camera_id: &str) -> Result<StopResponse> {
        let mut session = self
            .registry
            .remove(camera_id)
            .ok_or_else(|| Error::NotActive(camera_id.to_string()))?;

        session.state = SessionState::Stopping;
        if let Some(process) = session.process.as_mut() {
            process.terminate();
        }

        tracing::info!(
            camera_id = %camera_id,
            session_id = %session.session_id,
            "Stream session stopped"
        );

        Ok(StopResponse::stopped())
    }

    /// Registry lookup, no side effects
    pub fn status(&self, camera_id: &str) -> StreamStatus {
        self.registry
            .get(camera_id)
            .map(|info| StreamStatus::from(&info))
            .unwrap_or_else(StreamStatus::inactive)
    }

    /// All active sessions
    pub fn list(&self) -> Vec<SessionInfo> {
        self.registry.list()
    }

    /// Terminate every session. Used once, on server shutdown.
    ///
    /// Returns the number of sessions signalled.
    pub async fn shutdown_all(&self) -> usize {
        let sessions = self.registry.drain();
        if sessions.is_empty() {
            return 0;
        }

        let count = sessions.len();
        let mut exits = Vec::with_capacity(count);
        for mut session in sessions {
            session.state = SessionState::Stopping;
            if let Some(process) = session.process.as_mut() {
                process.terminate();
                exits.push(process.exit_watch());
            }
        }

        tracing::info!(sessions = count, "Stopping all stream sessions");

        let all_exited = async {
            for mut exit in exits {
                wait_for_exit(&mut exit).await;
            }
        };
        if tokio::time::timeout(self.stop_grace + SHUTDOWN_MARGIN, all_exited)
            .await
            .is_err()
        {
            tracing::warn!("Some transcoders did not exit before shutdown");
        }

        count
    }

    fn reconcile_on_exit(
        &self,
        camera_id: String,
        session_id: Uuid,
        mut exit: watch::Receiver<Option<ProcessExit>>,
    ) {
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            let outcome = wait_for_exit(&mut exit).await;

            match registry.remove_session(&camera_id, session_id) {
                Some(mut session) => {
                    session.state = SessionState::Stopped;
                    let err = Error::ProcessCrash {
                        camera_id: camera_id.clone(),
                        message: outcome.to_string(),
                    };
                    tracing::warn!(
                        camera_id = %camera_id,
                        session_id = %session_id,
                        state = ?session.state,
                        error = %err,
                        "Stream session ended without stop request"
                    );
                }
                None => {
                    tracing::debug!(
                        camera_id = %camera_id,
                        session_id = %session_id,
                        exit = %outcome,
                        "Transcoder exited after stop"
                    );
                }
            }
        });
    }
}
