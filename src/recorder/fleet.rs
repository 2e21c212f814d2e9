//! Fleet-wide scheduling: owns every camera monitor, the post-processing
//! queue, the day barrier and live reconciliation against the desired
//! camera list.
//!
//! Like the monitors it drives, the scheduler is a plain state machine fed
//! with explicit timestamps. Anything that touches the filesystem or runs a
//! program is spawned onto the runtime and reports back through the inbox
//! as a [`FleetMessage`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::barrier::DayBarrier;
use super::catalog::{Catalog, SharedCatalog, rebuild_and_write};
use super::layout::{RecordingLayout, is_raw_segment};
use super::markers::DayMarkerStore;
use super::monitor::{CameraMonitor, MonitorEvent, MonitorEventKind, MonitorSettings, MonitorState};
use super::retention_fs::{CleanReport, MAX_FS_CONCURRENCY, RetentionCleaner, RetentionPolicy};
use super::tasks::{TASK_DELAY_SECS, Task, TaskExecutor, TaskQueue};
use crate::config::{Camera, FleetConfig, FleetSnapshot};
use crate::core::error::{ConfigError, RecorderError};
use crate::core::lock::lock_mutex;
use crate::core::logging::{ComponentLogger, LogContext};
use crate::core::timestamp::format_day;
use crate::process::{ProcessEvent, ProcessEventSink, ProcessFactory};

pub const BARRIER_SETTLE_SECS: u64 = 5;
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetExit {
    Shutdown,
    CampaignEnded,
}

/// What subscribers see: every monitor signal plus fleet-level log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetEvent {
    Monitor(MonitorEvent),
    Log(String),
}

/// Completion reports from spawned side effects.
#[derive(Debug)]
pub enum FleetMessage {
    Process(ProcessEvent),
    TaskDone { task: Task, error: Option<String> },
    CleanDone(CleanReport),
    BarrierDone { error: Option<String> },
    Backfill { camera: String, day: NaiveDate },
    StaleScanDone,
}

#[derive(Debug, Clone)]
pub struct FleetSettings {
    pub recording_dir: PathBuf,
    pub monitor: MonitorSettings,
    pub no_recording: bool,
    pub barrier_settle: Duration,
    pub reindex_commands: Vec<Vec<String>>,
}

impl FleetSettings {
    pub fn from_config(config: &FleetConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            recording_dir: config.recording_dir(),
            monitor: MonitorSettings {
                segment_secs: config.segment_secs,
                campaign: config.campaign()?,
                verbose: config.monitor_log,
                file_log: config.file_log,
            },
            no_recording: config.no_recording,
            barrier_settle: Duration::from_secs(BARRIER_SETTLE_SECS),
            reindex_commands: config.reindex_commands.clone(),
        })
    }
}

/// External collaborators the fleet calls into.
pub struct FleetServices {
    pub catalog: SharedCatalog,
    pub factory: Arc<dyn ProcessFactory>,
    pub executor: Arc<dyn TaskExecutor>,
    pub markers: DayMarkerStore,
}

/// Receiving ends the driver must pump into [`FleetScheduler::handle`].
pub struct FleetReceivers {
    pub process: UnboundedReceiver<ProcessEvent>,
    pub inbox: UnboundedReceiver<FleetMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

struct MonitorSlot {
    instance: u64,
    monitor: CameraMonitor,
}

struct TaskLog<'a>(&'a str);

impl ComponentLogger for TaskLog<'_> {
    fn log_context(&self) -> LogContext {
        LogContext::new("task", self.0)
    }
}

pub struct FleetScheduler {
    settings: FleetSettings,
    layout: RecordingLayout,
    monitors: Vec<MonitorSlot>,
    // removed monitors waiting for their process to exit
    retiring: Vec<MonitorSlot>,
    queue: TaskQueue,
    running_task: Option<Task>,
    barrier: DayBarrier,
    cleaner: RetentionCleaner,
    services: FleetServices,
    process_tx: UnboundedSender<ProcessEvent>,
    inbox: UnboundedSender<FleetMessage>,
    monitor_tx: UnboundedSender<MonitorEvent>,
    monitor_rx: UnboundedReceiver<MonitorEvent>,
    events: broadcast::Sender<FleetEvent>,
    next_instance: u64,
    applied_revision: Option<u64>,
    stale_scan_pending: bool,
    clean_pending: bool,
    active: bool,
    exit: Option<FleetExit>,
}

impl ComponentLogger for FleetScheduler {
    fn log_context(&self) -> LogContext {
        LogContext::new("fleet", "recorder")
    }
}

impl FleetScheduler {
    pub fn new(
        settings: FleetSettings,
        cameras: Vec<Camera>,
        policy: RetentionPolicy,
        services: FleetServices,
    ) -> (Self, FleetReceivers) {
        let (process_tx, process_rx) = unbounded_channel();
        let (inbox, inbox_rx) = unbounded_channel();
        let (monitor_tx, monitor_rx) = unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let layout = RecordingLayout::new(&settings.recording_dir);
        let cleaner = RetentionCleaner::new(
            settings.recording_dir.clone(),
            policy,
            cameras.iter().map(|c| c.name.clone()).collect(),
        );

        let mut fleet = Self {
            settings,
            layout,
            monitors: Vec::with_capacity(cameras.len()),
            retiring: Vec::new(),
            queue: TaskQueue::new(),
            running_task: None,
            barrier: DayBarrier::new(),
            cleaner,
            services,
            process_tx,
            inbox,
            monitor_tx,
            monitor_rx,
            events,
            next_instance: 0,
            applied_revision: None,
            stale_scan_pending: false,
            clean_pending: false,
            active: false,
            exit: None,
        };
        for camera in cameras {
            let slot = fleet.create_monitor(camera);
            fleet.monitors.push(slot);
        }

        (
            fleet,
            FleetReceivers {
                process: process_rx,
                inbox: inbox_rx,
            },
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.events.subscribe()
    }

    /// Marks the revision the fleet was built from as already applied.
    pub fn mark_applied(&mut self, revision: u64) {
        self.applied_revision = Some(revision);
    }

    pub fn applied_revision(&self) -> Option<u64> {
        self.applied_revision
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn exit_reason(&self) -> Option<FleetExit> {
        self.exit
    }

    pub fn monitor_names(&self) -> Vec<String> {
        self.monitors
            .iter()
            .map(|s| s.monitor.name().to_string())
            .collect()
    }

    pub fn monitor_state(&self, camera: &str) -> Option<MonitorState> {
        self.monitor(camera).map(CameraMonitor::state)
    }

    pub fn monitor(&self, camera: &str) -> Option<&CameraMonitor> {
        self.monitors
            .iter()
            .map(|s| &s.monitor)
            .find(|m| m.name() == camera)
    }

    pub fn retiring_count(&self) -> usize {
        self.retiring.len()
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn running_task(&self) -> Option<&Task> {
        self.running_task.as_ref()
    }

    pub fn barrier(&self) -> &DayBarrier {
        &self.barrier
    }

    pub fn cleaner(&self) -> &RetentionCleaner {
        &self.cleaner
    }

    /// A post-task cleaner pass has been spawned and not reported back yet.
    pub fn clean_in_flight(&self) -> bool {
        self.clean_pending
    }

    /// True once every monitor, retiring ones included, reached `stopped`.
    pub fn all_stopped(&self) -> bool {
        self.monitors
            .iter()
            .chain(self.retiring.iter())
            .all(|s| s.monitor.state() == MonitorState::Stopped)
    }

    /// Initial cleaner pass and catalog rebuild, then every monitor.
    /// A camera whose day directory cannot be created is logged and left
    /// stopped.
    pub async fn start(&mut self, now: NaiveDateTime) {
        if self.active {
            return;
        }
        self.active = true;
        self.log("fleet start");

        let report = self.cleaner.clean_at(now.date()).await;
        self.info(&format!(
            "initial clean removed {} files ({} failed)",
            report.removed, report.failed
        ));

        let catalog = self.services.catalog.clone();
        match tokio::task::spawn_blocking(move || rebuild_and_write(&catalog)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.warn(&format!("catalog rebuild failed: {:#}", err)),
            Err(err) => self.warn(&format!("catalog rebuild aborted: {}", err)),
        }

        if self.settings.no_recording {
            self.log("recording disabled, monitors stay idle");
            return;
        }

        let mut failures = Vec::new();
        for slot in &mut self.monitors {
            let dir = self.layout.day_dir(slot.monitor.name(), now.date());
            let created = tokio::fs::create_dir_all(&dir).await;
            match created {
                Ok(()) => slot.monitor.start(now),
                Err(source) => failures.push((
                    slot.monitor.name().to_string(),
                    RecorderError::CreateDir { path: dir, source },
                )),
            }
        }
        for (camera, err) in failures {
            self.error(&format!("{} failed to start: {}", camera, err));
        }
        self.pump_monitor_events(now);
    }

    /// Stops every monitor. Their exits still arrive through
    /// [`FleetScheduler::handle`].
    pub fn stop(&mut self, now: NaiveDateTime) {
        if !self.active {
            return;
        }
        self.active = false;
        self.log("fleet stop");
        for slot in &mut self.monitors {
            slot.monitor.stop();
        }
        self.pump_monitor_events(now);
    }

    /// One-second poll: monitors first, then task dispatch.
    pub fn tick(&mut self, now: NaiveDateTime) {
        if !self.active {
            return;
        }
        for slot in &mut self.monitors {
            slot.monitor.tick(now);
        }
        self.pump_monitor_events(now);
        self.dispatch(now);
    }

    pub fn handle(&mut self, message: FleetMessage, now: NaiveDateTime) {
        match message {
            FleetMessage::Process(event) => self.on_process_event(event, now),
            FleetMessage::TaskDone { task, error } => self.on_task_done(task, error, now),
            FleetMessage::CleanDone(report) => {
                self.clean_pending = false;
                self.debug(&format!(
                    "clean pass removed {} files ({} failed)",
                    report.removed, report.failed
                ));
            }
            FleetMessage::BarrierDone { error } => match error {
                None => self.log("day close-out finished"),
                Some(err) => self.error(&format!("day close-out failed: {}", err)),
            },
            FleetMessage::Backfill { camera, day } => self.on_backfill(&camera, day, now),
            FleetMessage::StaleScanDone => self.stale_scan_pending = false,
        }
    }

    /// Queues the segment task, then the motion task, for one camera day.
    pub fn schedule_task(&mut self, camera: &str, day: NaiveDate, now: NaiveDateTime) {
        for task in Task::pair_for(&self.layout, camera, day, now) {
            self.queue.push(task);
        }
        TaskLog(camera).info(&format!(
            "queued segment and motion for {} ({} waiting)",
            format_day(day),
            self.queue.len()
        ));
    }

    /// Sixty-second poll. Only runs with an idle queue; scans sleeping
    /// cameras for days that still hold raw segments and backfills them.
    pub fn check_stale_days(&mut self, now: NaiveDateTime) {
        if !self.active
            || self.stale_scan_pending
            || self.running_task.is_some()
            || !self.queue.is_empty()
        {
            return;
        }
        let Some(earliest) = self.monitors.iter().map(|s| s.monitor.camera().start).min() else {
            return;
        };
        let current = if now.time() < earliest {
            now.date() - TimeDelta::days(1)
        } else {
            now.date()
        };

        let sleeping: Vec<String> = self
            .monitors
            .iter()
            .filter(|s| s.monitor.state() == MonitorState::Sleeping)
            .map(|s| s.monitor.name().to_string())
            .collect();
        if sleeping.is_empty() {
            return;
        }

        self.stale_scan_pending = true;
        tokio::spawn(scan_stale_days(
            self.layout.clone(),
            self.services.markers.clone(),
            current,
            sleeping,
            self.inbox.clone(),
        ));
    }

    /// Applies a desired-state snapshot: removals first, then additions, all
    /// keyed by camera name. A camera whose definition changed is replaced.
    /// An invalid snapshot leaves the fleet untouched and is retried on the
    /// next poll.
    pub fn reconcile(
        &mut self,
        snapshot: &FleetSnapshot,
        now: NaiveDateTime,
    ) -> Result<ReconcileReport, ConfigError> {
        if self.applied_revision == Some(snapshot.revision) {
            return Ok(ReconcileReport::default());
        }
        check_snapshot(&snapshot.cameras)?;

        let removed: Vec<String> = self
            .monitors
            .iter()
            .filter(|s| !snapshot.cameras.contains(s.monitor.camera()))
            .map(|s| s.monitor.name().to_string())
            .collect();
        for name in &removed {
            self.detach_camera(name, now);
        }

        let mut added = Vec::new();
        for camera in &snapshot.cameras {
            if self.monitor(&camera.name).is_none() {
                added.push(camera.name.clone());
                self.add_camera(camera.clone(), now);
            }
        }

        // one look at the barrier for the whole batch; a camera replaced
        // under the same name keeps its arrival
        let live = live_names(&self.monitors);
        if self.barrier.retarget(&live) {
            self.fire_barrier();
        }

        self.applied_revision = Some(snapshot.revision);
        let report = ReconcileReport { added, removed };
        if !report.is_empty() {
            self.log(&format!(
                "revision {}: added {:?}, removed {:?}",
                snapshot.revision, report.added, report.removed
            ));
        }
        Ok(report)
    }

    pub fn add_camera(&mut self, camera: Camera, now: NaiveDateTime) {
        if self.monitor(&camera.name).is_some() {
            return;
        }
        let name = camera.name.clone();
        let mut slot = self.create_monitor(camera);

        self.cleaner.add_camera(&name);
        lock_mutex(&self.services.catalog, "fleet.add_camera").add_camera(&name);

        if self.active && !self.settings.no_recording {
            slot.monitor.start(now);
        }
        self.monitors.push(slot);
        self.log(&format!("camera {} added", name));
        self.pump_monitor_events(now);
    }

    /// Stops the monitor and drops the camera from the live list, the
    /// cleaner and the catalog, all by name. The barrier is re-checked
    /// against the smaller fleet.
    pub fn remove_camera(&mut self, name: &str, now: NaiveDateTime) -> bool {
        if !self.detach_camera(name, now) {
            return false;
        }
        let live = live_names(&self.monitors);
        if self.barrier.retarget(&live) {
            self.fire_barrier();
        }
        true
    }

    fn detach_camera(&mut self, name: &str, now: NaiveDateTime) -> bool {
        let Some(index) = self.monitors.iter().position(|s| s.monitor.name() == name) else {
            return false;
        };
        let mut slot = self.monitors.remove(index);
        slot.monitor.stop();
        self.retiring.push(slot);

        self.cleaner.remove_camera(name);
        lock_mutex(&self.services.catalog, "fleet.remove_camera").remove_camera(name);
        self.log(&format!("camera {} removed", name));
        self.pump_monitor_events(now);
        true
    }

    fn create_monitor(&mut self, camera: Camera) -> MonitorSlot {
        let instance = self.next_instance;
        self.next_instance += 1;

        let sink = ProcessEventSink::new(&camera.name, instance, self.process_tx.clone());
        let process = self.services.factory.create(sink);
        MonitorSlot {
            instance,
            monitor: CameraMonitor::new(
                camera,
                self.layout.clone(),
                self.settings.monitor.clone(),
                process,
                self.monitor_tx.clone(),
            ),
        }
    }

    fn on_process_event(&mut self, event: ProcessEvent, now: NaiveDateTime) {
        let slot = self
            .monitors
            .iter_mut()
            .chain(self.retiring.iter_mut())
            .find(|s| s.instance == event.instance);
        match slot {
            Some(slot) => slot.monitor.on_process_event(event.kind, now),
            None => self.debug(&format!(
                "dropping event for retired {}#{}",
                event.camera, event.instance
            )),
        }
        self.retiring
            .retain(|s| s.monitor.state() != MonitorState::Stopped);
        self.pump_monitor_events(now);
    }

    fn pump_monitor_events(&mut self, now: NaiveDateTime) {
        while let Ok(event) = self.monitor_rx.try_recv() {
            // no subscribers is fine
            let _ = self.events.send(FleetEvent::Monitor(event.clone()));

            match event.kind {
                MonitorEventKind::DayDir(dir) => ensure_day_dir(dir),
                MonitorEventKind::Sleep(day) => self.on_day_finished(&event.camera, day, now),
                MonitorEventKind::CampaignEnded => {
                    if self.exit.is_none() {
                        self.log(&format!("campaign over, reported by {}", event.camera));
                        self.exit = Some(FleetExit::CampaignEnded);
                    }
                }
                MonitorEventKind::State(MonitorState::Error) => {
                    let live = live_names(&self.monitors);
                    if self.barrier.retarget(&live) {
                        self.fire_barrier();
                    }
                }
                _ => {}
            }
        }
    }

    fn on_day_finished(&mut self, camera: &str, day: NaiveDate, now: NaiveDateTime) {
        if self.monitor(camera).is_none() {
            return;
        }
        self.schedule_task(camera, day, now);

        let live = live_names(&self.monitors);
        if self.barrier.arrive(camera, &live) {
            self.fire_barrier();
        }
    }

    fn fire_barrier(&mut self) {
        self.log(&format!(
            "all cameras finished their day (cycle {})",
            self.barrier.fired_count()
        ));

        let cleaner = self.cleaner.clone();
        let catalog = self.services.catalog.clone();
        let commands = self.settings.reindex_commands.clone();
        let settle = self.settings.barrier_settle;
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let error = close_out_day(settle, cleaner, catalog, commands)
                .await
                .err()
                .map(|err| format!("{:#}", err));
            let _ = inbox.send(FleetMessage::BarrierDone { error });
        });
    }

    fn dispatch(&mut self, now: NaiveDateTime) {
        if self.running_task.is_some() {
            return;
        }
        let Some(task) = self.queue.pop_eligible(now) else {
            return;
        };

        TaskLog(&task.camera).info(&format!("running {}", task.label()));
        let work = self.services.executor.execute(task.clone());
        self.running_task = Some(task.clone());

        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let error = work.await.err().map(|err| format!("{:#}", err));
            let _ = inbox.send(FleetMessage::TaskDone { task, error });
        });
    }

    fn on_task_done(&mut self, task: Task, error: Option<String>, now: NaiveDateTime) {
        let task_log = TaskLog(&task.camera);
        match error {
            None => task_log.info(&format!("finished {}", task.label())),
            Some(err) => task_log.error(&format!("{} failed: {}", task.label(), err)),
        }
        self.running_task = None;

        if !self.clean_pending {
            self.clean_pending = true;
            let cleaner = self.cleaner.clone();
            let inbox = self.inbox.clone();
            tokio::spawn(async move {
                let report = cleaner.clean().await;
                let _ = inbox.send(FleetMessage::CleanDone(report));
            });
        }

        if self
            .queue
            .delay_head(now + TimeDelta::seconds(TASK_DELAY_SECS))
        {
            task_log.info(&format!("{} tasks left", self.queue.len()));
        } else {
            task_log.info("no more tasks");
        }
    }

    fn on_backfill(&mut self, camera: &str, day: NaiveDate, now: NaiveDateTime) {
        if self.monitor_state(camera) != Some(MonitorState::Sleeping) {
            return;
        }
        let known = self
            .queue
            .iter()
            .chain(self.running_task.iter())
            .any(|t| t.camera == camera && t.day == day);
        if known {
            return;
        }
        self.log(&format!("{} still holds raw segments for {}", camera, format_day(day)));
        self.schedule_task(camera, day, now);
    }

    fn log(&self, message: &str) {
        self.info(message);
        let _ = self.events.send(FleetEvent::Log(message.to_string()));
    }
}

/// Cameras that can still reach the end of a day.
fn live_names(monitors: &[MonitorSlot]) -> Vec<&str> {
    monitors
        .iter()
        .filter(|s| {
            !matches!(
                s.monitor.state(),
                MonitorState::Stopped | MonitorState::Error
            )
        })
        .map(|s| s.monitor.name())
        .collect()
}

fn ensure_day_dir(dir: PathBuf) {
    tokio::spawn(async move {
        if let Err(source) = tokio::fs::create_dir_all(&dir).await {
            log::warn!("[fleet] {}", RecorderError::CreateDir { path: dir, source });
        }
    });
}

fn check_snapshot(cameras: &[Camera]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (index, camera) in cameras.iter().enumerate() {
        if camera.name.trim().is_empty() {
            return Err(ConfigError::EmptyCameraName { index });
        }
        if !seen.insert(camera.name.as_str()) {
            return Err(ConfigError::DuplicateCamera {
                name: camera.name.clone(),
            });
        }
    }
    Ok(())
}

async fn close_out_day(
    settle: Duration,
    cleaner: RetentionCleaner,
    catalog: SharedCatalog,
    commands: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    tokio::time::sleep(settle).await;

    let report = cleaner.clean().await;
    log::info!(
        "[fleet] close-out clean removed {} files ({} failed)",
        report.removed,
        report.failed
    );

    tokio::task::spawn_blocking(move || rebuild_and_write(&catalog))
        .await
        .context("catalog rebuild aborted")??;

    run_reindex(&commands).await
}

/// Runs each command in order; the first failure stops the rest.
pub async fn run_reindex(commands: &[Vec<String>]) -> anyhow::Result<()> {
    for argv in commands {
        let Some((program, args)) = argv.split_first() else {
            continue;
        };
        log::info!("[fleet] reindex: {}", argv.join(" "));
        let status = tokio::process::Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|source| RecorderError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(RecorderError::CommandFailed {
                program: program.clone(),
                status: status.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

async fn scan_stale_days(
    layout: RecordingLayout,
    markers: DayMarkerStore,
    current: NaiveDate,
    cameras: Vec<String>,
    inbox: UnboundedSender<FleetMessage>,
) {
    let mut days = markers.load().await;
    if !days.contains(&current) {
        days.push(current);
    }

    let candidates: Vec<(String, NaiveDate)> = days
        .iter()
        .flat_map(|day| cameras.iter().map(move |camera| (camera.clone(), *day)))
        .collect();

    let hits: Vec<Option<(String, NaiveDate)>> = stream::iter(candidates)
        .map(|(camera, day)| {
            let dir = layout.day_dir(&camera, day);
            async move { has_raw_segments(&dir).await.then_some((camera, day)) }
        })
        .buffered(MAX_FS_CONCURRENCY)
        .collect()
        .await;

    for (camera, day) in hits.into_iter().flatten() {
        let _ = inbox.send(FleetMessage::Backfill { camera, day });
    }
    let _ = inbox.send(FleetMessage::StaleScanDone);
}

async fn has_raw_segments(dir: &Path) -> bool {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return false,
    };
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                if entry.file_name().to_str().is_some_and(is_raw_segment) {
                    return true;
                }
            }
            Ok(None) => return false,
            Err(err) => {
                log::warn!("[fleet] error read dir: {}: {}", dir.display(), err);
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn camera(name: &str) -> Camera {
        Camera {
            name: name.into(),
            address: format!("rtsp://{}/live", name),
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            stop: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        }
    }

    #[test]
    fn snapshot_with_duplicates_is_rejected() {
        let err = check_snapshot(&[camera("cam1"), camera("cam1")]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateCamera { .. }));
        assert!(check_snapshot(&[camera("cam1"), camera("cam2")]).is_ok());
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = check_snapshot(&[camera("cam1"), camera(" ")]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCameraName { index: 1 }));
    }

    #[tokio::test]
    async fn empty_reindex_list_succeeds() {
        run_reindex(&[]).await.unwrap();
        run_reindex(&[vec![]]).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reindex_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let commands = vec![
            vec!["false".to_string()],
            vec!["touch".to_string(), marker.display().to_string()],
        ];
        assert!(run_reindex(&commands).await.is_err());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn raw_segments_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_raw_segments(&dir.path().join("missing")).await);

        std::fs::write(dir.path().join("08.00.00.mp4"), b"").unwrap();
        assert!(!has_raw_segments(dir.path()).await);

        std::fs::write(dir.path().join("2024-02-01_08.00.00.mp4"), b"").unwrap();
        assert!(has_raw_segments(dir.path()).await);
    }
}
