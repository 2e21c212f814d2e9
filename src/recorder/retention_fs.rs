// src/recorder/retention_fs.rs
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use super::layout::is_segment_file;
use crate::core::lock::{lock_rwlock_read, lock_rwlock_write};
use crate::core::logging::{ComponentLogger, LogContext};
use crate::core::timestamp::parse_day;

/// Fan-out cap for directory scans and deletions.
pub const MAX_FS_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetentionAction {
    Delete,
    Keep,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetentionRule {
    pub after_days: i64,
    pub action: RetentionAction,
}

/// Ordered retention rules. Order is the authored order and matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    rules: Vec<RetentionRule>,
}

impl RetentionPolicy {
    pub fn new(rules: Vec<RetentionRule>) -> Self {
        Self { rules }
    }

    /// Last rule in list order whose threshold is strictly below `age_days`.
    pub fn active(&self, age_days: i64) -> Option<&RetentionRule> {
        self.rules.iter().rev().find(|r| r.after_days < age_days)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: usize,
    pub failed: usize,
}

struct CleanerInner {
    recording_dir: PathBuf,
    policy: RetentionPolicy,
    cameras: RwLock<Vec<String>>,
    // one pass at a time across all clones
    pass: tokio::sync::Mutex<()>,
}

/// Deletes segment files from day folders that fell out of retention.
///
/// Cheap to clone; clones share the camera set. Only the fleet mutates that
/// set (construction and reconciliation).
#[derive(Clone)]
pub struct RetentionCleaner {
    inner: Arc<CleanerInner>,
}

impl ComponentLogger for RetentionCleaner {
    fn log_context(&self) -> LogContext {
        LogContext::new("cleaner", "retention")
    }
}

impl RetentionCleaner {
    pub fn new(recording_dir: PathBuf, policy: RetentionPolicy, cameras: Vec<String>) -> Self {
        Self {
            inner: Arc::new(CleanerInner {
                recording_dir,
                policy,
                cameras: RwLock::new(cameras),
                pass: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn cameras(&self) -> Vec<String> {
        lock_rwlock_read(&self.inner.cameras, "cleaner.cameras").clone()
    }

    pub fn add_camera(&self, name: &str) {
        let mut cameras = lock_rwlock_write(&self.inner.cameras, "cleaner.add_camera");
        if !cameras.iter().any(|c| c == name) {
            cameras.push(name.to_string());
        }
    }

    pub fn remove_camera(&self, name: &str) -> bool {
        let mut cameras = lock_rwlock_write(&self.inner.cameras, "cleaner.remove_camera");
        let before = cameras.len();
        cameras.retain(|c| c != name);
        cameras.len() != before
    }

    pub async fn clean(&self) -> CleanReport {
        self.clean_at(Local::now().date_naive()).await
    }

    /// One full pass. Never fails: unreadable directories and failed
    /// deletions are logged and skipped. Passes started from different
    /// clones queue up behind each other.
    pub async fn clean_at(&self, today: NaiveDate) -> CleanReport {
        let _pass = self.inner.pass.lock().await;
        self.info("cleaning old files");

        let per_camera: Vec<Vec<PathBuf>> = stream::iter(self.cameras())
            .map(|camera| self.scan_camera(camera, today))
            .buffer_unordered(MAX_FS_CONCURRENCY)
            .collect()
            .await;

        let mut candidates: Vec<PathBuf> = per_camera.into_iter().flatten().collect();
        candidates.sort();
        candidates.dedup();

        // TODO: remove day folders emptied by this pass
        self.delete_candidates(candidates).await
    }

    pub async fn delete_candidates(&self, candidates: Vec<PathBuf>) -> CleanReport {
        let outcomes: Vec<bool> = stream::iter(candidates)
            .map(|path| async move {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        self.info(&format!("removed {}", path.display()));
                        true
                    }
                    Err(err) => {
                        self.warn(&format!("error removing file {}: {}", path.display(), err));
                        false
                    }
                }
            })
            .buffer_unordered(MAX_FS_CONCURRENCY)
            .collect()
            .await;

        let removed = outcomes.iter().filter(|ok| **ok).count();
        CleanReport {
            removed,
            failed: outcomes.len() - removed,
        }
    }

    async fn scan_camera(&self, camera: String, today: NaiveDate) -> Vec<PathBuf> {
        let camera_dir = self.inner.recording_dir.join(&camera);
        let names = match list_dir(&camera_dir).await {
            Ok(names) => names,
            Err(err) => {
                self.warn(&format!("error read dir: {}: {}", camera_dir.display(), err));
                return Vec::new();
            }
        };

        let days: Vec<(PathBuf, NaiveDate)> = names
            .into_iter()
            .filter_map(|name| parse_day(&name).map(|day| (camera_dir.join(name), day)))
            .collect();

        let per_day: Vec<Vec<PathBuf>> = stream::iter(days)
            .map(|(dir, day)| self.scan_day(&camera, dir, day, today))
            .buffer_unordered(MAX_FS_CONCURRENCY)
            .collect()
            .await;

        per_day.into_iter().flatten().collect()
    }

    async fn scan_day(
        &self,
        camera: &str,
        dir: PathBuf,
        day: NaiveDate,
        today: NaiveDate,
    ) -> Vec<PathBuf> {
        let age_days = (today - day).num_days();
        match self.inner.policy.active(age_days) {
            Some(rule) if rule.action == RetentionAction::Delete => {}
            _ => return Vec::new(),
        }

        let segments: Vec<String> = match list_dir(&dir).await {
            Ok(names) => names.into_iter().filter(|n| is_segment_file(n)).collect(),
            Err(err) => {
                self.warn(&format!("error read dir: {}: {}", dir.display(), err));
                return Vec::new();
            }
        };

        let keep = self.keep_set(camera, day, &segments);
        segments
            .into_iter()
            .filter(|name| !keep.contains(name))
            .map(|name| dir.join(name))
            .collect()
    }

    /// Files to pin inside an expired day folder. Nothing is pinned today,
    /// so every segment of an expired folder is deleted.
    fn keep_set(&self, _camera: &str, _day: NaiveDate, _segments: &[String]) -> HashSet<String> {
        HashSet::new()
    }
}

async fn list_dir(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
