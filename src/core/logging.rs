// src/core/logging.rs
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::NaiveDateTime;

use super::timestamp::log_timestamp;

// Global sequence number for correlating interleaved component lines
static LOG_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct LogContext {
    pub component: String,
    pub instance_id: String,
    pub sequence: u64,
}

impl LogContext {
    pub fn new(component: &str, instance_id: &str) -> Self {
        Self {
            component: component.to_string(),
            instance_id: instance_id.to_string(),
            sequence: LOG_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn format(&self, level: &str, message: &str) -> String {
        format!(
            "[{}][seq={:06}][{}:{}] {}",
            level, self.sequence, self.component, self.instance_id, message
        )
    }
}

/// Uniform logging for fleet components.
pub trait ComponentLogger {
    fn log_context(&self) -> LogContext;

    fn debug(&self, message: &str) {
        let ctx = self.log_context();
        log::debug!("{}", ctx.format("DEBUG", message));
    }

    fn info(&self, message: &str) {
        let ctx = self.log_context();
        log::info!("{}", ctx.format("INFO", message));
    }

    fn warn(&self, message: &str) {
        let ctx = self.log_context();
        log::warn!("{}", ctx.format("WARN", message));
    }

    fn error(&self, message: &str) {
        let ctx = self.log_context();
        log::error!("{}", ctx.format("ERROR", message));
    }
}

/// Append-only `log.txt` kept next to a camera's day folders.
#[derive(Debug)]
pub struct CameraLogFile {
    path: PathBuf,
    failed: AtomicBool,
}

impl CameraLogFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            failed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn append(&self, at: NaiveDateTime, message: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{} - {}", log_timestamp(at), message));

        if let Err(err) = result {
            // report once, the state machine never depends on this file
            if !self.failed.swap(true, Ordering::Relaxed) {
                log::warn!("camera log {:?} not writable: {}", self.path, err);
            }
        }
    }
}
