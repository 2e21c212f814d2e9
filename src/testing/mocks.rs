use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::core::lock::lock_mutex;
use crate::process::{
    ProcessEventKind, ProcessEventSink, ProcessFactory, ProcessHandle, ProcessState,
    ProcessStatus,
};
use crate::recorder::catalog::{Catalog, CatalogCamera, CatalogScan};

#[derive(Default)]
struct MockProcessShared {
    status: Option<ProcessStatus>,
    spawns: Vec<(Vec<String>, PathBuf)>,
    stops: usize,
    fail_spawn: bool,
    sink: Option<ProcessEventSink>,
}

/// Process double that records calls. Without a sink, lifecycle events are
/// delivered by the test itself; with one (factory-built), `stop` reports
/// `Exit` right away like an idle real handle and the probe can inject
/// further events.
pub struct MockProcess {
    shared: Arc<Mutex<MockProcessShared>>,
}

/// Test-side view onto a [`MockProcess`].
#[derive(Clone)]
pub struct MockProcessProbe {
    shared: Arc<Mutex<MockProcessShared>>,
}

impl MockProcess {
    pub fn new() -> (Self, MockProcessProbe) {
        let shared = Arc::new(Mutex::new(MockProcessShared::default()));
        (
            Self {
                shared: shared.clone(),
            },
            MockProcessProbe { shared },
        )
    }

    pub fn with_sink(sink: ProcessEventSink) -> (Self, MockProcessProbe) {
        let (process, probe) = Self::new();
        lock_mutex(&process.shared, "mock_process.with_sink").sink = Some(sink);
        (process, probe)
    }
}

impl ProcessHandle for MockProcess {
    fn spawn(&mut self, args: &[String], working_dir: &Path) -> Result<()> {
        let mut shared = lock_mutex(&self.shared, "mock_process.spawn");
        if shared.fail_spawn {
            anyhow::bail!("mock spawn failure");
        }
        shared.spawns.push((args.to_vec(), working_dir.to_path_buf()));
        let crash_count = shared.status.as_ref().map_or(0, |s| s.crash_count);
        shared.status = Some(ProcessStatus {
            state: ProcessState::Running,
            last_frame_at: None,
            crash_count,
        });
        Ok(())
    }

    fn stop(&mut self) {
        let mut shared = lock_mutex(&self.shared, "mock_process.stop");
        shared.stops += 1;
        if let Some(status) = shared.status.as_mut() {
            status.state = ProcessState::Stopped;
        }
        if let Some(sink) = &shared.sink {
            sink.send(ProcessEventKind::Exit);
        }
    }

    fn status(&self) -> ProcessStatus {
        lock_mutex(&self.shared, "mock_process.status")
            .status
            .clone()
            .unwrap_or_else(ProcessStatus::stopped)
    }
}

impl MockProcessProbe {
    pub fn spawn_count(&self) -> usize {
        lock_mutex(&self.shared, "mock_probe.spawn_count").spawns.len()
    }

    pub fn stop_count(&self) -> usize {
        lock_mutex(&self.shared, "mock_probe.stop_count").stops
    }

    pub fn last_spawn_dir(&self) -> Option<PathBuf> {
        lock_mutex(&self.shared, "mock_probe.last_spawn_dir")
            .spawns
            .last()
            .map(|(_, dir)| dir.clone())
    }

    pub fn is_running(&self) -> bool {
        lock_mutex(&self.shared, "mock_probe.is_running")
            .status
            .as_ref()
            .is_some_and(|s| s.state == ProcessState::Running)
    }

    /// Simulates recorder progress.
    pub fn report_frame(&self, at: NaiveDateTime) {
        let mut shared = lock_mutex(&self.shared, "mock_probe.report_frame");
        if let Some(status) = shared.status.as_mut() {
            status.last_frame_at = Some(at);
        }
    }

    pub fn fail_spawns(&self, fail: bool) {
        lock_mutex(&self.shared, "mock_probe.fail_spawns").fail_spawn = fail;
    }

    /// Posts an event as if the process produced it. A `Crash` also marks
    /// the process stopped and bumps the crash counter.
    pub fn emit(&self, kind: ProcessEventKind) {
        let mut shared = lock_mutex(&self.shared, "mock_probe.emit");
        if kind == ProcessEventKind::Crash {
            if let Some(status) = shared.status.as_mut() {
                status.state = ProcessState::Stopped;
                status.crash_count += 1;
            }
        }
        if let Some(sink) = &shared.sink {
            sink.send(kind);
        }
    }
}

/// Hands out [`MockProcess`]es and keeps a probe per camera name.
#[derive(Clone, Default)]
pub struct MockProcessFactory {
    probes: Arc<Mutex<HashMap<String, MockProcessProbe>>>,
}

impl MockProcessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self, camera: &str) -> Option<MockProcessProbe> {
        lock_mutex(&self.probes, "mock_factory.probe")
            .get(camera)
            .cloned()
    }
}

impl ProcessFactory for MockProcessFactory {
    fn create(&self, sink: ProcessEventSink) -> Box<dyn ProcessHandle> {
        let camera = sink.camera().to_string();
        let (process, probe) = MockProcess::with_sink(sink);
        lock_mutex(&self.probes, "mock_factory.create").insert(camera, probe);
        Box::new(process)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalogState {
    pub cameras: Vec<String>,
    pub rebuilds: usize,
    pub writes: usize,
}

/// Catalog double keeping only camera names and call counts.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    state: Arc<Mutex<MemoryCatalogState>>,
}

impl MemoryCatalog {
    pub fn new(cameras: &[&str]) -> Self {
        let catalog = Self::default();
        lock_mutex(&catalog.state, "memory_catalog.new").cameras =
            cameras.iter().map(|c| c.to_string()).collect();
        catalog
    }

    pub fn rebuilds(&self) -> usize {
        lock_mutex(&self.state, "memory_catalog.rebuilds").rebuilds
    }

    pub fn writes(&self) -> usize {
        lock_mutex(&self.state, "memory_catalog.writes").writes
    }
}

impl Catalog for MemoryCatalog {
    fn scan(&self) -> CatalogScan {
        Box::new(Vec::<CatalogCamera>::new)
    }

    fn install(&mut self, _scanned: Vec<CatalogCamera>) {
        lock_mutex(&self.state, "memory_catalog.install").rebuilds += 1;
    }

    fn write(&self) -> Result<()> {
        lock_mutex(&self.state, "memory_catalog.write").writes += 1;
        Ok(())
    }

    fn add_camera(&mut self, name: &str) {
        let mut state = lock_mutex(&self.state, "memory_catalog.add_camera");
        if !state.cameras.iter().any(|c| c == name) {
            state.cameras.push(name.to_string());
        }
    }

    fn remove_camera(&mut self, name: &str) {
        lock_mutex(&self.state, "memory_catalog.remove_camera")
            .cameras
            .retain(|c| c != name);
    }

    fn camera_names(&self) -> Vec<String> {
        lock_mutex(&self.state, "memory_catalog.camera_names")
            .cameras
            .clone()
    }
}
