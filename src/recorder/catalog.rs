use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::layout::{RecordingLayout, is_segment_file};
use crate::core::lock::lock_mutex;
use crate::core::logging::{ComponentLogger, LogContext};
use crate::core::timestamp::parse_day;

/// Directory walk detached from the catalog, so it can run while the
/// shared lock is free.
pub type CatalogScan = Box<dyn FnOnce() -> Vec<CatalogCamera> + Send>;

/// Index of recorded days per camera. Mutated by the fleet during
/// reconciliation and rebuilt at every day barrier.
pub trait Catalog: Send {
    /// Captures what a rebuild needs to read the recording tree.
    fn scan(&self) -> CatalogScan;
    /// Takes over a finished scan. Cameras removed since the scan was
    /// taken stay removed, cameras the scan has no listing for keep
    /// their current one.
    fn install(&mut self, scanned: Vec<CatalogCamera>);
    fn write(&self) -> Result<()>;
    fn add_camera(&mut self, name: &str);
    fn remove_camera(&mut self, name: &str);
    fn camera_names(&self) -> Vec<String>;

    fn rebuild_all(&mut self) {
        let scanned = (self.scan())();
        self.install(scanned);
    }
}

pub type SharedCatalog = Arc<Mutex<Box<dyn Catalog>>>;

pub fn shared(catalog: impl Catalog + 'static) -> SharedCatalog {
    Arc::new(Mutex::new(Box::new(catalog)))
}

/// Rebuilds and persists in one go; used from blocking tasks. The lock is
/// only held to take the scan and to install its result.
pub fn rebuild_and_write(catalog: &SharedCatalog) -> Result<()> {
    let scan = lock_mutex(catalog, "catalog.scan").scan();
    let scanned = scan();

    let mut guard = lock_mutex(catalog, "catalog.install");
    guard.install(scanned);
    guard.write()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogFolder {
    pub day: String,
    pub files: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCamera {
    pub camera_name: String,
    pub folders: Vec<CatalogFolder>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogDocument {
    pub cameras: Vec<CatalogCamera>,
}

/// Reads the recording tree; owns nothing the fleet mutates.
#[derive(Clone)]
struct TreeScanner {
    layout: RecordingLayout,
    file_name: String,
}

impl ComponentLogger for TreeScanner {
    fn log_context(&self) -> LogContext {
        LogContext::new("catalog", &self.file_name)
    }
}

/// JSON catalog stored inside the recording directory.
pub struct JsonCatalog {
    scanner: TreeScanner,
    cameras: Vec<CatalogCamera>,
}

impl ComponentLogger for JsonCatalog {
    fn log_context(&self) -> LogContext {
        self.scanner.log_context()
    }
}

impl JsonCatalog {
    pub fn new(layout: RecordingLayout, file_name: &str, cameras: &[String]) -> Self {
        Self {
            scanner: TreeScanner {
                layout,
                file_name: file_name.to_string(),
            },
            cameras: cameras
                .iter()
                .map(|name| CatalogCamera {
                    camera_name: name.clone(),
                    folders: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.scanner.layout.root().join(&self.scanner.file_name)
    }

    pub fn cameras(&self) -> &[CatalogCamera] {
        &self.cameras
    }
}

impl TreeScanner {
    /// Cameras whose tree cannot be read are left out of the result.
    fn run(&self, cameras: &[String]) -> Vec<CatalogCamera> {
        self.info("rebuilding catalog");
        cameras
            .iter()
            .filter_map(|camera| match self.scan_camera(camera) {
                Ok(folders) => Some(CatalogCamera {
                    camera_name: camera.clone(),
                    folders,
                }),
                Err(err) => {
                    self.warn(&format!("{}: {:#}", camera, err));
                    None
                }
            })
            .collect()
    }

    fn scan_camera(&self, camera: &str) -> Result<Vec<CatalogFolder>> {
        let dir = self.layout.camera_dir(camera);
        if !dir.is_dir() {
            self.debug(&format!("no recordings for {} yet", camera));
            return Ok(Vec::new());
        }

        let mut days: Vec<String> = fs::read_dir(&dir)
            .with_context(|| format!("reading {}", dir.display()))?
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| parse_day(name).is_some())
            .collect();
        days.sort();

        let mut folders = Vec::with_capacity(days.len());
        for day in days {
            let day_dir = dir.join(&day);
            let mut files: Vec<String> = match fs::read_dir(&day_dir) {
                Ok(entries) => entries
                    .flatten()
                    .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
                    .filter(|name| is_segment_file(name))
                    .collect(),
                Err(err) => {
                    self.warn(&format!("skipping {}: {}", day_dir.display(), err));
                    continue;
                }
            };
            files.sort();
            folders.push(CatalogFolder { day, files });
        }
        Ok(folders)
    }
}

impl Catalog for JsonCatalog {
    fn scan(&self) -> CatalogScan {
        let scanner = self.scanner.clone();
        let cameras = self.camera_names();
        Box::new(move || scanner.run(&cameras))
    }

    fn install(&mut self, scanned: Vec<CatalogCamera>) {
        for camera in &mut self.cameras {
            if let Some(fresh) = scanned
                .iter()
                .find(|s| s.camera_name == camera.camera_name)
            {
                camera.folders = fresh.folders.clone();
            }
        }
    }

    fn write(&self) -> Result<()> {
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        let doc = CatalogDocument {
            cameras: self.cameras.clone(),
        };
        let body = serde_json::to_string_pretty(&doc)?;
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        self.info(&format!("catalog written to {}", path.display()));
        Ok(())
    }

    fn add_camera(&mut self, name: &str) {
        if self.cameras.iter().any(|c| c.camera_name == name) {
            return;
        }
        self.cameras.push(CatalogCamera {
            camera_name: name.to_string(),
            folders: Vec::new(),
        });
    }

    fn remove_camera(&mut self, name: &str) {
        self.cameras.retain(|c| c.camera_name != name);
    }

    fn camera_names(&self) -> Vec<String> {
        self.cameras.iter().map(|c| c.camera_name.clone()).collect()
    }
}
