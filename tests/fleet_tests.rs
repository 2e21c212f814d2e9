use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::future::BoxFuture;
use tempfile::TempDir;

use camfleet::config::{Camera, Campaign, FleetSnapshot};
use camfleet::recorder::catalog;
use camfleet::recorder::{
    Catalog, DayMarkerStore, FleetEvent, FleetExit, FleetMessage, FleetReceivers, FleetScheduler,
    FleetServices, FleetSettings, MonitorSettings, MonitorState, RecordingLayout, RetentionPolicy,
    Task, TaskExecutor, TaskKind,
};
use camfleet::testing::{MemoryCatalog, MockProcessFactory};

fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, day)
        .and_then(|d| d.and_hms_opt(h, m, s))
        .unwrap()
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn camera(name: &str) -> Camera {
    Camera {
        name: name.into(),
        address: format!("rtsp://{}/live", name),
        start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        stop: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
    }
}

fn fleet_of(names: &[&str]) -> Vec<Camera> {
    names.iter().map(|n| camera(n)).collect()
}

#[derive(Default)]
struct RecordingExecutor {
    runs: Mutex<Vec<Task>>,
    fail: bool,
}

impl RecordingExecutor {
    fn runs(&self) -> Vec<(TaskKind, String, NaiveDate)> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .map(|t| (t.kind, t.camera.clone(), t.day))
            .collect()
    }
}

impl TaskExecutor for RecordingExecutor {
    fn execute(&self, task: Task) -> BoxFuture<'static, anyhow::Result<()>> {
        self.runs.lock().unwrap().push(task);
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                anyhow::bail!("encoder failed");
            }
            Ok(())
        })
    }
}

struct Harness {
    fleet: FleetScheduler,
    rx: FleetReceivers,
    factory: MockProcessFactory,
    catalog: MemoryCatalog,
    executor: Arc<RecordingExecutor>,
    dir: TempDir,
}

impl Harness {
    fn new(cameras: Vec<Camera>) -> Self {
        Self::build(cameras, |_| {}, false)
    }

    fn build(
        cameras: Vec<Camera>,
        configure: impl FnOnce(&mut FleetSettings),
        fail_tasks: bool,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<&str> = cameras.iter().map(|c| c.name.as_str()).collect();
        let catalog = MemoryCatalog::new(&names);
        let factory = MockProcessFactory::new();
        let executor = Arc::new(RecordingExecutor {
            runs: Mutex::new(Vec::new()),
            fail: fail_tasks,
        });

        let mut settings = FleetSettings {
            recording_dir: dir.path().join("recording"),
            monitor: MonitorSettings {
                segment_secs: 300,
                campaign: None,
                verbose: false,
                file_log: false,
            },
            no_recording: false,
            barrier_settle: Duration::ZERO,
            reindex_commands: Vec::new(),
        };
        configure(&mut settings);

        let services = FleetServices {
            catalog: catalog::shared(catalog.clone()),
            factory: Arc::new(factory.clone()),
            executor: executor.clone(),
            markers: DayMarkerStore::new(dir.path().join("convert_day.toml")),
        };
        let (fleet, rx) =
            FleetScheduler::new(settings, cameras, RetentionPolicy::default(), services);

        Self {
            fleet,
            rx,
            factory,
            catalog,
            executor,
            dir,
        }
    }

    fn recording_dir(&self) -> PathBuf {
        self.dir.path().join("recording")
    }

    /// Feeds everything already queued back into the fleet.
    fn pump(&mut self, now: NaiveDateTime) {
        loop {
            let mut progressed = false;
            while let Ok(event) = self.rx.process.try_recv() {
                self.fleet.handle(FleetMessage::Process(event), now);
                progressed = true;
            }
            while let Ok(message) = self.rx.inbox.try_recv() {
                self.fleet.handle(message, now);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    fn tick(&mut self, now: NaiveDateTime) {
        self.fleet.tick(now);
        self.pump(now);
    }

    /// Handles inbox messages until one matches.
    async fn wait_for(&mut self, now: NaiveDateTime, pred: impl Fn(&FleetMessage) -> bool) {
        loop {
            self.pump_process(now);
            let message = tokio::time::timeout(Duration::from_secs(5), self.rx.inbox.recv())
                .await
                .expect("fleet message in time")
                .expect("inbox open");
            let hit = pred(&message);
            self.fleet.handle(message, now);
            if hit {
                return;
            }
        }
    }

    fn pump_process(&mut self, now: NaiveDateTime) {
        while let Ok(event) = self.rx.process.try_recv() {
            self.fleet.handle(FleetMessage::Process(event), now);
        }
    }

    /// Runs one full recording day (09:00 to 20:00) on `day`.
    fn record_day(&mut self, day: u32) {
        self.tick(at(day, 9, 0, 0));
        self.tick(at(day, 9, 0, 1));
        self.tick(at(day, 9, 0, 4));
        self.tick(at(day, 20, 0, 0));
    }
}

#[tokio::test]
async fn test_start_cleans_and_builds_catalog_first() {
    let mut h = Harness::new(fleet_of(&["cam1", "cam2"]));
    let mut events = h.fleet.subscribe();

    h.fleet.start(at(1, 7, 0, 0)).await;
    assert!(h.fleet.is_active());
    assert_eq!(h.catalog.rebuilds(), 1);
    assert_eq!(h.catalog.writes(), 1);
    for name in ["cam1", "cam2"] {
        assert_eq!(h.fleet.monitor_state(name), Some(MonitorState::Sleeping));
        assert_eq!(h.factory.probe(name).unwrap().spawn_count(), 0);
    }

    let seen: Vec<FleetEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert_eq!(seen.first(), Some(&FleetEvent::Log("fleet start".into())));
    assert!(seen.iter().any(|ev| matches!(ev, FleetEvent::Monitor(m) if m.camera == "cam2")));
}

#[tokio::test]
async fn test_no_recording_leaves_monitors_idle() {
    let mut h = Harness::build(fleet_of(&["cam1"]), |s| s.no_recording = true, false);
    h.fleet.start(at(1, 7, 0, 0)).await;
    h.tick(at(1, 9, 0, 0));
    h.tick(at(1, 9, 0, 5));

    assert_eq!(h.catalog.writes(), 1);
    assert_eq!(h.fleet.monitor_state("cam1"), Some(MonitorState::Stopped));
    assert_eq!(h.factory.probe("cam1").unwrap().spawn_count(), 0);
}

#[tokio::test]
async fn test_barrier_fires_once_per_full_cycle() {
    let mut h = Harness::new(fleet_of(&["cam1", "cam2", "cam3"]));
    h.fleet.start(at(1, 7, 0, 0)).await;

    h.record_day(1);
    assert_eq!(h.fleet.barrier().fired_count(), 1);
    for name in ["cam1", "cam2", "cam3"] {
        assert_eq!(h.fleet.monitor_state(name), Some(MonitorState::Sleeping));
    }

    let queued: Vec<(TaskKind, String)> = h
        .fleet
        .queue()
        .iter()
        .map(|t| (t.kind, t.camera.clone()))
        .collect();
    assert_eq!(
        queued,
        vec![
            (TaskKind::Segment, "cam1".to_string()),
            (TaskKind::Motion, "cam1".to_string()),
            (TaskKind::Segment, "cam2".to_string()),
            (TaskKind::Motion, "cam2".to_string()),
            (TaskKind::Segment, "cam3".to_string()),
            (TaskKind::Motion, "cam3".to_string()),
        ]
    );

    h.wait_for(at(1, 20, 0, 1), |m| matches!(m, FleetMessage::BarrierDone { .. }))
        .await;
    assert_eq!(h.catalog.rebuilds(), 2);
    assert_eq!(h.catalog.writes(), 2);

    h.record_day(2);
    assert_eq!(h.fleet.barrier().fired_count(), 2);
}

#[tokio::test]
async fn test_removal_completes_waiting_barrier() {
    let mut late = camera("cam2");
    late.stop = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
    let mut h = Harness::new(vec![camera("cam1"), late, camera("cam3")]);
    h.fleet.start(at(1, 7, 0, 0)).await;

    h.record_day(1);
    assert_eq!(h.fleet.monitor_state("cam2"), Some(MonitorState::Running));
    assert_eq!(h.fleet.barrier().arrived(), 2);
    assert_eq!(h.fleet.barrier().fired_count(), 0);

    assert!(h.fleet.remove_camera("cam2", at(1, 20, 0, 5)));
    assert_eq!(h.fleet.barrier().fired_count(), 1);
}

#[tokio::test]
async fn test_replacing_a_camera_mid_cycle_keeps_the_barrier_waiting() {
    let mut late = camera("cam2");
    late.stop = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
    let mut h = Harness::new(vec![camera("cam1"), late.clone()]);
    h.fleet.start(at(1, 7, 0, 0)).await;

    h.record_day(1);
    assert_eq!(h.fleet.barrier().arrived(), 1);
    assert_eq!(h.fleet.monitor_state("cam2"), Some(MonitorState::Running));

    let mut moved = late;
    moved.address = "rtsp://10.0.0.99/live".into();
    let snapshot = FleetSnapshot {
        revision: 1,
        cameras: vec![camera("cam1"), moved],
    };
    h.fleet.reconcile(&snapshot, at(1, 20, 0, 5)).unwrap();
    h.pump(at(1, 20, 0, 5));

    assert_eq!(h.fleet.monitor_names(), vec!["cam1", "cam2"]);
    assert_eq!(h.fleet.barrier().fired_count(), 0);
    assert_eq!(h.fleet.barrier().arrived(), 1);

    // the replacement records the rest of its window and closes the cycle
    h.tick(at(1, 20, 0, 6));
    h.tick(at(1, 20, 0, 9));
    assert_eq!(h.factory.probe("cam2").unwrap().spawn_count(), 1);
    h.tick(at(1, 22, 0, 0));
    assert_eq!(h.fleet.barrier().fired_count(), 1);
}

#[tokio::test]
async fn test_replaced_camera_keeps_its_arrival() {
    let mut h = Harness::new(fleet_of(&["cam1", "cam2", "cam3"]));
    h.fleet.start(at(1, 7, 0, 0)).await;
    h.tick(at(1, 9, 0, 0));
    h.tick(at(1, 9, 0, 3));

    // only cam1 reaches the end of its day
    let mut early = camera("cam1");
    early.stop = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
    h.fleet
        .reconcile(
            &FleetSnapshot {
                revision: 1,
                cameras: vec![early.clone(), camera("cam2"), camera("cam3")],
            },
            at(1, 9, 0, 5),
        )
        .unwrap();
    h.pump(at(1, 9, 0, 5));
    h.tick(at(1, 9, 0, 6));
    h.tick(at(1, 9, 0, 9));
    h.tick(at(1, 12, 0, 0));
    assert_eq!(h.fleet.barrier().arrived(), 1);

    // a second change to cam1 while it already finished its day
    early.address = "rtsp://10.0.0.42/live".into();
    h.fleet
        .reconcile(
            &FleetSnapshot {
                revision: 2,
                cameras: vec![early, camera("cam2"), camera("cam3")],
            },
            at(1, 13, 0, 0),
        )
        .unwrap();
    h.pump(at(1, 13, 0, 0));
    assert_eq!(h.fleet.barrier().arrived(), 1);
    assert_eq!(h.fleet.barrier().fired_count(), 0);

    h.tick(at(1, 20, 0, 0));
    assert_eq!(h.fleet.barrier().fired_count(), 1);
}

#[tokio::test]
async fn test_task_cleanups_do_not_pile_up() {
    let mut h = Harness::new(fleet_of(&["cam1"]));
    h.fleet.start(at(1, 7, 0, 0)).await;

    let layout = RecordingLayout::new(h.recording_dir());
    let [segment, motion] = Task::pair_for(&layout, "cam1", date(2, 1), at(2, 8, 0, 0));
    h.fleet.handle(
        FleetMessage::TaskDone {
            task: segment,
            error: None,
        },
        at(2, 8, 0, 6),
    );
    assert!(h.fleet.clean_in_flight());
    h.fleet.handle(
        FleetMessage::TaskDone {
            task: motion,
            error: None,
        },
        at(2, 8, 0, 7),
    );

    h.wait_for(at(2, 8, 0, 8), |m| matches!(m, FleetMessage::CleanDone(_)))
        .await;
    assert!(!h.fleet.clean_in_flight());

    // both completions shared one pass
    let extra = tokio::time::timeout(Duration::from_millis(200), h.rx.inbox.recv()).await;
    assert!(extra.is_err());
}

#[test]
fn test_schedule_task_orders_segment_before_motion() {
    let mut h = Harness::new(fleet_of(&["cam1"]));
    let now = at(2, 8, 0, 0);

    h.fleet.schedule_task("cam1", date(2, 1), now);
    h.fleet.schedule_task("cam2", date(2, 1), now);

    let queued: Vec<_> = h.fleet.queue().iter().collect();
    assert_eq!(queued.len(), 4);
    assert_eq!(queued[0].kind, TaskKind::Segment);
    assert_eq!(queued[1].kind, TaskKind::Motion);
    assert_eq!(queued[0].camera, "cam1");
    assert_eq!(queued[1].camera, "cam1");
    assert_eq!(queued[2].kind, TaskKind::Segment);
    assert_eq!(queued[3].kind, TaskKind::Motion);
    assert!(queued.iter().all(|t| t.not_before == at(2, 8, 0, 5)));
    assert_eq!(
        queued[1].motion_dir,
        Some(h.recording_dir().join("cam1").join("motion"))
    );
}

#[tokio::test]
async fn test_one_task_at_a_time_with_cool_down() {
    let mut h = Harness::new(fleet_of(&["cam1"]));
    h.fleet.start(at(1, 7, 0, 0)).await;
    h.fleet.schedule_task("cam1", date(1, 30), at(1, 7, 0, 0));
    h.fleet.schedule_task("cam1", date(1, 31), at(1, 7, 0, 0));

    h.fleet.tick(at(1, 7, 0, 5));
    assert!(h.fleet.running_task().is_none());

    h.fleet.tick(at(1, 7, 0, 6));
    assert_eq!(h.fleet.running_task().map(|t| t.kind), Some(TaskKind::Segment));
    h.fleet.tick(at(1, 7, 0, 7));
    assert_eq!(h.fleet.queue().len(), 3);

    h.wait_for(at(1, 7, 0, 8), |m| matches!(m, FleetMessage::TaskDone { .. }))
        .await;
    assert!(h.fleet.running_task().is_none());
    assert_eq!(h.fleet.queue().head().map(|t| t.not_before), Some(at(1, 7, 0, 13)));

    h.fleet.tick(at(1, 7, 0, 10));
    assert!(h.fleet.running_task().is_none());
    h.fleet.tick(at(1, 7, 0, 14));
    assert_eq!(h.fleet.running_task().map(|t| t.kind), Some(TaskKind::Motion));

    assert_eq!(
        h.executor.runs(),
        vec![
            (TaskKind::Segment, "cam1".to_string(), date(1, 30)),
            (TaskKind::Motion, "cam1".to_string(), date(1, 30)),
        ]
    );
}

#[tokio::test]
async fn test_failed_task_frees_the_slot() {
    let mut h = Harness::build(fleet_of(&["cam1"]), |_| {}, true);
    h.fleet.start(at(1, 7, 0, 0)).await;
    h.fleet.schedule_task("cam1", date(1, 31), at(1, 7, 0, 0));

    h.fleet.tick(at(1, 7, 0, 6));
    h.wait_for(at(1, 7, 0, 7), |m| matches!(m, FleetMessage::TaskDone { .. }))
        .await;
    assert!(h.fleet.running_task().is_none());

    h.fleet.tick(at(1, 7, 0, 13));
    assert_eq!(h.fleet.running_task().map(|t| t.kind), Some(TaskKind::Motion));
}

#[tokio::test]
async fn test_reconcile_drops_camera_by_name() {
    let mut h = Harness::new(fleet_of(&["cam1", "cam2", "cam3"]));
    h.fleet.start(at(1, 7, 0, 0)).await;

    let snapshot = FleetSnapshot {
        revision: 1,
        cameras: fleet_of(&["cam1", "cam3"]),
    };
    let report = h.fleet.reconcile(&snapshot, at(1, 7, 0, 5)).unwrap();

    assert_eq!(report.removed, vec!["cam2".to_string()]);
    assert!(report.added.is_empty());
    assert_eq!(h.fleet.monitor_names(), vec!["cam1", "cam3"]);
    assert_eq!(h.fleet.cleaner().cameras(), vec!["cam1", "cam3"]);
    assert_eq!(h.catalog.camera_names(), vec!["cam1", "cam3"]);

    assert_eq!(h.factory.probe("cam2").unwrap().stop_count(), 1);
    assert_eq!(h.factory.probe("cam1").unwrap().stop_count(), 0);
    assert_eq!(h.factory.probe("cam3").unwrap().stop_count(), 0);

    assert_eq!(h.fleet.retiring_count(), 1);
    h.pump(at(1, 7, 0, 6));
    assert_eq!(h.fleet.retiring_count(), 0);
}

#[tokio::test]
async fn test_reconcile_adds_and_starts_camera() {
    let mut h = Harness::new(fleet_of(&["cam1"]));
    h.fleet.start(at(1, 7, 0, 0)).await;

    let snapshot = FleetSnapshot {
        revision: 1,
        cameras: fleet_of(&["cam1", "cam4"]),
    };
    let report = h.fleet.reconcile(&snapshot, at(1, 7, 0, 5)).unwrap();

    assert_eq!(report.added, vec!["cam4".to_string()]);
    assert_eq!(h.fleet.monitor_state("cam4"), Some(MonitorState::Sleeping));
    assert_eq!(h.fleet.cleaner().cameras(), vec!["cam1", "cam4"]);
    assert_eq!(h.catalog.camera_names(), vec!["cam1", "cam4"]);

    h.tick(at(1, 9, 0, 0));
    h.tick(at(1, 9, 0, 3));
    assert_eq!(h.factory.probe("cam4").unwrap().spawn_count(), 1);
}

#[tokio::test]
async fn test_reconcile_applies_each_revision_once() {
    let mut h = Harness::new(fleet_of(&["cam1", "cam2"]));
    h.fleet.start(at(1, 7, 0, 0)).await;
    h.fleet.mark_applied(3);

    let same_revision = FleetSnapshot {
        revision: 3,
        cameras: fleet_of(&["cam1"]),
    };
    assert!(
        h.fleet
            .reconcile(&same_revision, at(1, 7, 0, 5))
            .unwrap()
            .is_empty()
    );
    assert_eq!(h.fleet.monitor_names(), vec!["cam1", "cam2"]);
}

#[tokio::test]
async fn test_invalid_snapshot_leaves_fleet_untouched() {
    let mut h = Harness::new(fleet_of(&["cam1", "cam2"]));
    h.fleet.start(at(1, 7, 0, 0)).await;

    let broken = FleetSnapshot {
        revision: 1,
        cameras: fleet_of(&["cam1", "cam1"]),
    };
    assert!(h.fleet.reconcile(&broken, at(1, 7, 0, 5)).is_err());
    assert_eq!(h.fleet.applied_revision(), None);
    assert_eq!(h.fleet.monitor_names(), vec!["cam1", "cam2"]);
    assert_eq!(h.fleet.cleaner().cameras(), vec!["cam1", "cam2"]);
    assert_eq!(h.catalog.camera_names(), vec!["cam1", "cam2"]);

    let fixed = FleetSnapshot {
        revision: 1,
        cameras: fleet_of(&["cam1"]),
    };
    let report = h.fleet.reconcile(&fixed, at(1, 7, 0, 10)).unwrap();
    assert_eq!(report.removed, vec!["cam2".to_string()]);
    assert_eq!(h.fleet.applied_revision(), Some(1));
}

#[tokio::test]
async fn test_changed_camera_is_replaced() {
    let mut h = Harness::new(fleet_of(&["cam1", "cam2"]));
    h.fleet.start(at(1, 7, 0, 0)).await;
    let old_probe = h.factory.probe("cam1").unwrap();

    let mut moved = camera("cam1");
    moved.address = "rtsp://10.0.0.99/live".into();
    let snapshot = FleetSnapshot {
        revision: 1,
        cameras: vec![moved, camera("cam2")],
    };
    let report = h.fleet.reconcile(&snapshot, at(1, 7, 0, 5)).unwrap();

    assert_eq!(report.removed, vec!["cam1".to_string()]);
    assert_eq!(report.added, vec!["cam1".to_string()]);
    assert_eq!(old_probe.stop_count(), 1);
    assert_eq!(h.fleet.monitor_names(), vec!["cam2", "cam1"]);
    assert_eq!(
        h.fleet.monitor("cam1").unwrap().camera().address,
        "rtsp://10.0.0.99/live"
    );

    // the old handle's exit must not reach the replacement
    h.pump(at(1, 7, 0, 6));
    assert_eq!(h.fleet.retiring_count(), 0);
    assert_eq!(h.fleet.monitor_state("cam1"), Some(MonitorState::Sleeping));
    assert_eq!(h.fleet.cleaner().cameras(), vec!["cam2", "cam1"]);
}

#[tokio::test]
async fn test_campaign_end_requests_fleet_exit() {
    let mut h = Harness::build(
        fleet_of(&["cam1", "cam2"]),
        |s| {
            s.monitor.campaign = Some(Campaign {
                start: None,
                end: date(2, 1),
            })
        },
        false,
    );
    h.fleet.start(at(1, 7, 0, 0)).await;

    h.tick(at(1, 23, 59, 59));
    assert_eq!(h.fleet.exit_reason(), None);
    h.tick(at(2, 0, 0, 1));
    assert_eq!(h.fleet.exit_reason(), Some(FleetExit::CampaignEnded));
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut h = Harness::new(fleet_of(&["cam1", "cam2"]));
    h.fleet.start(at(1, 7, 0, 0)).await;

    h.fleet.stop(at(1, 8, 0, 0));
    h.fleet.stop(at(1, 8, 0, 1));
    assert!(!h.fleet.is_active());
    assert!(!h.fleet.all_stopped());
    for name in ["cam1", "cam2"] {
        assert_eq!(h.factory.probe(name).unwrap().stop_count(), 1);
    }

    h.pump(at(1, 8, 0, 2));
    assert!(h.fleet.all_stopped());
}

#[tokio::test]
async fn test_stale_days_are_backfilled() {
    let mut h = Harness::new(fleet_of(&["cam1", "cam2"]));
    let root = h.recording_dir();
    for (cam, day, file) in [
        ("cam2", "20240125", "2024-01-25_10.00.00.mp4"),
        ("cam1", "20240131", "2024-01-31_10.00.00.mp4"),
        ("cam2", "20240131", "10.00.00.mp4"),
    ] {
        let dir = root.join(cam).join(day);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file), b"").unwrap();
    }
    std::fs::write(
        h.dir.path().join("convert_day.toml"),
        "days = [\"20240125\"]\n",
    )
    .unwrap();

    // before the earliest start time, so yesterday is checked
    let now = at(1, 7, 0, 0);
    h.fleet.start(now).await;
    h.fleet.check_stale_days(now);
    h.wait_for(now, |m| matches!(m, FleetMessage::StaleScanDone))
        .await;

    let queued: Vec<(TaskKind, String, NaiveDate)> = h
        .fleet
        .queue()
        .iter()
        .map(|t| (t.kind, t.camera.clone(), t.day))
        .collect();
    assert_eq!(
        queued,
        vec![
            (TaskKind::Segment, "cam2".to_string(), date(1, 25)),
            (TaskKind::Motion, "cam2".to_string(), date(1, 25)),
            (TaskKind::Segment, "cam1".to_string(), date(1, 31)),
            (TaskKind::Motion, "cam1".to_string(), date(1, 31)),
        ]
    );

    // busy queue: no second scan
    h.fleet.check_stale_days(at(1, 7, 1, 0));
    assert!(h.rx.inbox.try_recv().is_err());
}
