//! Transcoder process launching and supervision

use super::types::{ProcessExit, TranscodeJob, TranscodeProfile};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};

/// Starts transcoder processes
pub trait TranscodeLauncher: Send + Sync {
    /// Spawn the process for `job`. Must be called within a tokio runtime.
    fn launch(&self, job: &TranscodeJob) -> std::io::Result<ProcessHandle>;
}

/// Owned handle to a running transcoder.
///
/// Holds the one-shot termination signal and the exit notification.
/// Dropping the handle also requests termination.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    terminate: Option<oneshot::Sender<()>>,
    exit: watch::Receiver<Option<ProcessExit>>,
}

/// Supervisor side of a [`ProcessHandle`]
#[derive(Debug)]
pub struct ProcessControl {
    terminate: oneshot::Receiver<()>,
    exit: watch::Sender<Option<ProcessExit>>,
}

impl ProcessHandle {
    pub fn channel(pid: Option<u32>) -> (Self, ProcessControl) {
        let (terminate_tx, terminate_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        (
            Self {
                pid,
                terminate: Some(terminate_tx),
                exit: exit_rx,
            },
            ProcessControl {
                terminate: terminate_rx,
                exit: exit_tx,
            },
        )
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Request graceful termination. Returns false if already requested.
    pub fn terminate(&mut self) -> bool {
        match self.terminate.take() {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Exit notification, usable after the handle is gone
    pub fn exit_watch(&self) -> watch::Receiver<Option<ProcessExit>> {
        self.exit.clone()
    }
}

impl ProcessControl {
    /// Resolves once termination is requested or the handle is dropped.
    /// Await at most once.
    pub async fn terminated(&mut self) {
        let _ = (&mut self.terminate).await;
    }

    /// Publish the exit outcome
    pub fn exited(self, exit: ProcessExit) {
        self.exit.send_replace(Some(exit));
    }
}

/// Wait for the exit notification of a process
pub async fn wait_for_exit(exit: &mut watch::Receiver<Option<ProcessExit>>) -> ProcessExit {
    match exit.wait_for(Option::is_some).await {
        Ok(outcome) => outcome
            .clone()
            .unwrap_or_else(|| ProcessExit::Lost("empty exit notification".to_string())),
        Err(_) => ProcessExit::Lost("supervisor dropped".to_string()),
    }
}

/// ffmpeg HLS launcher with a low-latency argument profile
pub struct FfmpegLauncher {
    profile: TranscodeProfile,
}

impl FfmpegLauncher {
    pub fn new(profile: TranscodeProfile) -> Self {
        Self { profile }
    }

    /// Command-line arguments for `job`
    pub fn args(&self, job: &TranscodeJob) -> Vec<String> {
        let segment_seconds = self.profile.segment_seconds.max(1);
        let gop = segment_seconds * 25;

        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];

        if job.source_url.starts_with("rtsp://") || job.source_url.starts_with("rtsps://") {
            args.extend(["-rtsp_transport".to_string(), "tcp".to_string()]);
        }

        args.extend(
            [
                // short probe windows, no input buffering
                "-fflags", "nobuffer",
                "-flags", "low_delay",
                "-analyzeduration", "500000",
                "-probesize", "500000",
            ]
            .map(String::from),
        );
        args.extend(["-i".to_string(), job.source_url.clone()]);

        args.extend(
            [
                "-c:v", "libx264",
                "-preset", "ultrafast",
                "-tune", "zerolatency",
            ]
            .map(String::from),
        );
        args.extend(["-g".to_string(), gop.to_string()]);
        args.extend(
            [
                "-sc_threshold", "0",
                "-c:a", "aac",
                "-b:a", "64k",
                "-ac", "1",
                "-f", "hls",
            ]
            .map(String::from),
        );
        args.extend(["-hls_time".to_string(), segment_seconds.to_string()]);
        args.extend(["-hls_list_size".to_string(), self.profile.list_size.to_string()]);
        args.extend(
            [
                "-hls_flags", "delete_segments+omit_endlist",
                "-hls_allow_cache", "0",
            ]
            .map(String::from),
        );
        args.extend([
            "-hls_segment_filename".to_string(),
            job.segment_pattern().to_string_lossy().into_owned(),
            job.playlist_path().to_string_lossy().into_owned(),
        ]);

        args
    }
}

impl TranscodeLauncher for FfmpegLauncher {
    fn launch(&self, job: &TranscodeJob) -> std::io::Result<ProcessHandle> {
        let mut child = Command::new(&self.profile.program)
            .args(self.args(job))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let (handle, mut control) = ProcessHandle::channel(child.id());
        let camera_id = job.camera_id.clone();
        let grace = self.profile.stop_grace;

        if let Some(stderr) = child.stderr.take() {
            let camera_id = camera_id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(camera_id = %camera_id, "ffmpeg: {}", line);
                }
            });
        }

        tokio::spawn(async move {
            let finished = tokio::select! {
                status = child.wait() => Some(status),
                _ = control.terminated() => None,
            };

            let exit = match finished {
                Some(status) => exit_from(status),
                None => quit_child(&mut child, grace, &camera_id).await,
            };

            tracing::debug!(camera_id = %camera_id, exit = %exit, "Transcoder process ended");
            control.exited(exit);
        });

        Ok(handle)
    }
}

/// Ask ffmpeg to quit via stdin, then kill after `grace`
async fn quit_child(child: &mut Child, grace: Duration, camera_id: &str) -> ProcessExit {
    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(b"q").await;
        let _ = stdin.flush().await;
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => exit_from(status),
        Err(_) => {
            tracing::warn!(
                camera_id = %camera_id,
                grace_ms = grace.as_millis() as u64,
                "Transcoder did not quit in time, killing"
            );
            if let Err(e) = child.kill().await {
                return ProcessExit::Lost(e.to_string());
            }
            exit_from(child.wait().await)
        }
    }
}

fn exit_from(status: std::io::Result<ExitStatus>) -> ProcessExit {
    match status {
        Ok(status) => ProcessExit::Exited {
            code: status.code(),
        },
        Err(e) => ProcessExit::Lost(e.to_string()),
    }
}
