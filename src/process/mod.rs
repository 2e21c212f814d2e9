//! Contract between a camera monitor and the subprocess that records for it.
//!
//! Handles are fire-and-forget: `spawn` and `stop` return immediately and the
//! outcome arrives later as a [`ProcessEvent`] on the fleet inbox.

use std::path::Path;

use chrono::NaiveDateTime;
use tokio::sync::mpsc::UnboundedSender;

pub mod ffmpeg;

pub use ffmpeg::{FfmpegFactory, FfmpegProcess};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStatus {
    pub state: ProcessState,
    pub last_frame_at: Option<NaiveDateTime>,
    pub crash_count: u32,
}

impl ProcessStatus {
    pub fn stopped() -> Self {
        Self {
            state: ProcessState::Stopped,
            last_frame_at: None,
            crash_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEventKind {
    Start,
    /// The process ended after a requested stop.
    Exit,
    /// The process ended on its own.
    Crash,
    /// The handle failed internally (e.g. the binary could not be launched).
    Error(String),
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEvent {
    pub camera: String,
    /// Distinguishes successive handles created for the same camera name.
    pub instance: u64,
    pub kind: ProcessEventKind,
}

/// Posts events for one camera into whatever channel the owner listens on.
#[derive(Clone)]
pub struct ProcessEventSink {
    camera: String,
    instance: u64,
    tx: UnboundedSender<ProcessEvent>,
}

impl ProcessEventSink {
    pub fn new(camera: &str, instance: u64, tx: UnboundedSender<ProcessEvent>) -> Self {
        Self {
            camera: camera.to_string(),
            instance,
            tx,
        }
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn send(&self, kind: ProcessEventKind) {
        // the fleet may already be gone during shutdown
        let _ = self.tx.send(ProcessEvent {
            camera: self.camera.clone(),
            instance: self.instance,
            kind,
        });
    }
}

pub trait ProcessHandle: Send {
    fn spawn(&mut self, args: &[String], working_dir: &Path) -> anyhow::Result<()>;
    fn stop(&mut self);
    fn status(&self) -> ProcessStatus;
}

pub trait ProcessFactory: Send + Sync {
    fn create(&self, sink: ProcessEventSink) -> Box<dyn ProcessHandle>;
}
