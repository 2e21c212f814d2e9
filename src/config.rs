use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{NaiveDate, NaiveTime};

use crate::core::error::ConfigError;
use crate::core::timestamp::parse_clock_time;
use crate::recorder::retention_fs::RetentionRule;

// ---------- Cameras ----------
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    pub name: String,
    pub address: String,
    pub start: String,
    pub stop: String,
}

/// A validated camera. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camera {
    pub name: String,
    pub address: String,
    pub start: NaiveTime,
    pub stop: NaiveTime,
}

/// Date-bounded recording campaign. A missing `start` means the campaign
/// begins on the day the monitor is first started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Campaign {
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
}

// ---------- Fleet ----------
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FleetConfig {
    pub work_dir: PathBuf,
    #[serde(default = "default_catalog_name")]
    pub catalog_name: String,
    #[serde(default = "default_segment_secs")]
    pub segment_secs: u32,
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
    #[serde(default)]
    pub campaign_start: Option<NaiveDate>,
    #[serde(default)]
    pub campaign_end: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub monitor_log: bool,
    #[serde(default = "default_true")]
    pub file_log: bool,
    #[serde(default)]
    pub no_recording: bool,
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
    #[serde(default)]
    pub convert_day_file: Option<PathBuf>,
    #[serde(default)]
    pub task_program: Option<PathBuf>,
    #[serde(default)]
    pub reindex_commands: Vec<Vec<String>>,
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
    #[serde(default)]
    pub retention: Vec<RetentionRule>,
}

fn default_catalog_name() -> String {
    "catalog.json".to_string()
}

fn default_segment_secs() -> u32 {
    300
}

fn default_ffmpeg_bin() -> String {
    "ffmpeg".to_string()
}

fn default_stop_timeout_secs() -> u64 {
    5
}

fn default_reconcile_interval_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl FleetConfig {
    pub fn recording_dir(&self) -> PathBuf {
        self.work_dir.join("recording")
    }

    pub fn convert_day_path(&self) -> PathBuf {
        self.convert_day_file
            .clone()
            .unwrap_or_else(|| self.work_dir.join("convert_day.toml"))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }

    /// Validates the camera list: names non-empty and unique, clock-times
    /// parseable. Order is preserved.
    pub fn validated_cameras(&self) -> Result<Vec<Camera>, ConfigError> {
        validate_cameras(&self.cameras)
    }

    pub fn campaign(&self) -> Result<Option<Campaign>, ConfigError> {
        match (self.campaign_start, self.campaign_end) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::message(
                "campaign_start requires campaign_end",
            )),
            (start, Some(end)) => {
                if let Some(start) = start {
                    if start > end {
                        return Err(ConfigError::message(format!(
                            "campaign_start {} is after campaign_end {}",
                            start, end
                        )));
                    }
                }
                Ok(Some(Campaign { start, end }))
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validated_cameras()?;
        self.campaign()?;
        if self.segment_secs == 0 {
            return Err(ConfigError::message("segment_secs must be positive"));
        }
        if let Some(cmd) = self.reindex_commands.iter().find(|c| c.is_empty()) {
            return Err(ConfigError::message(format!(
                "empty reindex command in {:?}",
                cmd
            )));
        }
        Ok(())
    }
}

pub fn validate_cameras(cameras: &[CameraConfig]) -> Result<Vec<Camera>, ConfigError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(cameras.len());

    for (index, cam) in cameras.iter().enumerate() {
        let name = cam.name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyCameraName { index });
        }
        if !seen.insert(name.to_string()) {
            return Err(ConfigError::DuplicateCamera {
                name: name.to_string(),
            });
        }
        let start = parse_clock_time(&cam.start).ok_or_else(|| ConfigError::InvalidClockTime {
            camera: name.to_string(),
            field: "start",
            value: cam.start.clone(),
        })?;
        let stop = parse_clock_time(&cam.stop).ok_or_else(|| ConfigError::InvalidClockTime {
            camera: name.to_string(),
            field: "stop",
            value: cam.stop.clone(),
        })?;
        out.push(Camera {
            name: name.to_string(),
            address: cam.address.clone(),
            start,
            stop,
        });
    }

    Ok(out)
}

// ---------- Loader ----------
pub fn load(path: impl AsRef<Path>) -> Result<FleetConfig, ConfigError> {
    let path = path.as_ref();
    let txt = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::with_context(format!("reading {}", path.display()), e))?;
    let cfg: FleetConfig = toml::from_str(&txt)
        .map_err(|e| ConfigError::with_context(format!("parsing {}", path.display()), e))?;
    cfg.validate()?;
    Ok(cfg)
}

// ---------- Desired-state snapshots ----------

/// Desired camera list at a given revision. Revisions only move forward and
/// change only when the camera list itself changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetSnapshot {
    pub revision: u64,
    pub cameras: Vec<Camera>,
}

pub trait ConfigSource: Send {
    /// Returns the latest valid snapshot. An error means the source currently
    /// holds an invalid document; the previous snapshot stays authoritative.
    fn poll(&mut self) -> Result<FleetSnapshot, ConfigError>;
}

/// Re-reads the config file whenever its modification time moves.
pub struct FileConfigSource {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    current: FleetSnapshot,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>, initial: &FleetConfig) -> Result<Self, ConfigError> {
        let path = path.into();
        let last_modified = modified_at(&path).ok();
        Ok(Self {
            path,
            last_modified,
            current: FleetSnapshot {
                revision: 0,
                cameras: initial.validated_cameras()?,
            },
        })
    }

    pub fn current(&self) -> &FleetSnapshot {
        &self.current
    }
}

fn modified_at(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

impl ConfigSource for FileConfigSource {
    fn poll(&mut self) -> Result<FleetSnapshot, ConfigError> {
        let modified = modified_at(&self.path)
            .map_err(|e| ConfigError::with_context(format!("stat {}", self.path.display()), e))?;

        if Some(modified) == self.last_modified {
            return Ok(self.current.clone());
        }

        // last_modified only advances on success, so a broken file is retried
        let cfg = load(&self.path)?;
        let cameras = cfg.validated_cameras()?;
        self.last_modified = Some(modified);

        if cameras != self.current.cameras {
            self.current = FleetSnapshot {
                revision: self.current.revision + 1,
                cameras,
            };
        }
        Ok(self.current.clone())
    }
}
