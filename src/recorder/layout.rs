//! On-disk layout: `recordingDir/<camera>/<YYYYMMDD>/<file>`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::core::timestamp::format_day;

/// Length of a raw segment name such as `2024-02-01_08.00.00.mp4`.
pub const RAW_SEGMENT_NAME_LEN: usize = 23;

pub const SEGMENT_EXTENSION: &str = "mp4";

/// strftime pattern handed to the recorder for raw segment names.
pub const RAW_SEGMENT_PATTERN: &str = "%Y-%m-%d_%H.%M.%S.mp4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingLayout {
    root: PathBuf,
}

impl RecordingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn camera_dir(&self, camera: &str) -> PathBuf {
        self.root.join(camera)
    }

    pub fn day_dir(&self, camera: &str, day: NaiveDate) -> PathBuf {
        self.camera_dir(camera).join(format_day(day))
    }

    pub fn motion_dir(&self, camera: &str) -> PathBuf {
        self.camera_dir(camera).join("motion")
    }

    pub fn camera_log(&self, camera: &str) -> PathBuf {
        self.camera_dir(camera).join("log.txt")
    }
}

pub fn is_segment_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == SEGMENT_EXTENSION)
}

/// Raw, not yet converted segment: long strftime name with `.mp4`.
pub fn is_raw_segment(name: &str) -> bool {
    is_segment_file(name) && name.len() == RAW_SEGMENT_NAME_LEN
}
