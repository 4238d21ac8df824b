//! Session registry - active sessions keyed by camera id
//!
//! The lock is only held for synchronous map operations, never across an
//! `.await`, so check-and-insert is atomic for concurrent start calls.

use super::transcoder::ProcessHandle;
use super::types::{SessionInfo, SessionState};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// One camera's transcode session
#[derive(Debug)]
pub struct Session {
    pub session_id: Uuid,
    pub camera_id: String,
    pub source_url: String,
    pub output_dir: PathBuf,
    pub hls_url: String,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    /// None while Starting
    pub process: Option<ProcessHandle>,
}

impl Session {
    pub fn new(camera_id: &str, source_url: String, output_dir: PathBuf, hls_url: String) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            camera_id: camera_id.to_string(),
            source_url,
            output_dir,
            hls_url,
            state: SessionState::Starting,
            started_at: Utc::now(),
            process: None,
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            camera_id: self.camera_id.clone(),
            session_id: self.session_id,
            hls_url: self.hls_url.clone(),
            state: self.state,
            started_at: self.started_at,
            pid: self.process.as_ref().and_then(ProcessHandle::pid),
        }
    }
}

/// Outcome of [`SessionRegistry::reserve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// Entry inserted
    Reserved(Uuid),
    /// A session already exists for the camera
    Existing { hls_url: String },
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `session` unless its camera already has one
    pub fn reserve(&self, session: Session) -> Reservation {
        let mut sessions = self.sessions.lock();

        if let Some(existing) = sessions.get(&session.camera_id) {
            return Reservation::Existing {
                hls_url: existing.hls_url.clone(),
            };
        }

        let session_id = session.session_id;
        sessions.insert(session.camera_id.clone(), session);
        Reservation::Reserved(session_id)
    }

    /// Attach the spawned process to a Starting session.
    ///
    /// Hands the process back if the session was removed meanwhile.
    pub fn attach(
        &self,
        camera_id: &str,
        session_id: Uuid,
        process: ProcessHandle,
    ) -> Result<(), ProcessHandle> {
        let mut sessions = self.sessions.lock();

        match sessions.get_mut(camera_id) {
            Some(session) if session.session_id == session_id => {
                session.process = Some(process);
                session.state = SessionState::Running;
                Ok(())
            }
            _ => Err(process),
        }
    }

    /// Remove whatever session the camera has
    pub fn remove(&self, camera_id: &str) -> Option<Session> {
        self.sessions.lock().remove(camera_id)
    }

    /// Remove the camera's session only if it is `session_id`
    pub fn remove_session(&self, camera_id: &str, session_id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.lock();

        let current = sessions
            .get(camera_id)
            .is_some_and(|s| s.session_id == session_id);
        if current {
            sessions.remove(camera_id)
        } else {
            None
        }
    }

    pub fn get(&self, camera_id: &str) -> Option<SessionInfo> {
        self.sessions.lock().get(camera_id).map(Session::info)
    }

    /// Snapshot ordered by camera id
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut list: Vec<_> = self.sessions.lock().values().map(Session::info).collect();
        list.sort_by(|a, b| a.camera_id.cmp(&b.camera_id));
        list
    }

    /// Remove every session
    pub fn drain(&self) -> Vec<Session> {
        self.sessions.lock().drain().map(|(_, s)| s).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// Releases a `Starting` reservation when dropped, unless disarmed once the
/// process is attached
#[must_use]
pub struct ReservationGuard<'a> {
    registry: &'a SessionRegistry,
    camera_id: &'a str,
    session_id: Uuid,
    armed: bool,
}

impl<'a> ReservationGuard<'a> {
    pub fn new(registry: &'a SessionRegistry, camera_id: &'a str, session_id: Uuid) -> Self {
        Self {
            registry,
            camera_id,
            session_id,
            armed: true,
        }
    }

    /// Keep the session in the registry
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ReservationGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self
            .registry
            .remove_session(self.camera_id, self.session_id)
            .is_some()
        {
            tracing::debug!(
                camera_id = %self.camera_id,
                session_id = %self.session_id,
                "Released unfinished stream reservation"
            );
        }
    }
}
