use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::core::timestamp::parse_day;

#[derive(Debug, Default, Deserialize)]
struct MarkerFile {
    #[serde(default)]
    days: Vec<String>,
}

/// Days queued for catch-up conversion, kept as `days = ["YYYYMMDD", ...]`.
#[derive(Debug, Clone)]
pub struct DayMarkerStore {
    path: PathBuf,
}

impl DayMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Marked days in file order. A missing file means no markers; an
    /// unreadable one or a bad entry is logged and skipped.
    pub async fn load(&self) -> Vec<NaiveDate> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                log::warn!("[markers] cannot read {}: {}", self.path.display(), err);
                return Vec::new();
            }
        };
        parse_markers(&text, &self.path)
    }
}

fn parse_markers(text: &str, path: &Path) -> Vec<NaiveDate> {
    let file: MarkerFile = match toml::from_str(text) {
        Ok(file) => file,
        Err(err) => {
            log::warn!("[markers] invalid {}: {}", path.display(), err);
            return Vec::new();
        }
    };

    let mut days = Vec::with_capacity(file.days.len());
    for entry in file.days {
        match parse_day(&entry) {
            Some(day) if !days.contains(&day) => days.push(day),
            Some(_) => {}
            None => log::warn!("[markers] ignoring '{}' in {}", entry, path.display()),
        }
    }
    days
}
