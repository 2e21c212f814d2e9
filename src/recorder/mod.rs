// src/recorder/mod.rs

pub mod barrier;
pub mod catalog;
pub mod fleet;
pub mod layout;
pub mod markers;
pub mod monitor;
pub mod recorder;
pub mod retention_fs;
pub mod tasks;
pub mod window;

pub use barrier::DayBarrier;
pub use catalog::{Catalog, JsonCatalog, SharedCatalog};
pub use fleet::{
    FleetEvent, FleetExit, FleetMessage, FleetReceivers, FleetScheduler, FleetServices,
    FleetSettings, ReconcileReport,
};
pub use layout::RecordingLayout;
pub use markers::DayMarkerStore;
pub use monitor::{CameraMonitor, MonitorEvent, MonitorEventKind, MonitorSettings, MonitorState};
pub use recorder::{RecorderConfig, run_recorder};
pub use retention_fs::{
    CleanReport, RetentionAction, RetentionCleaner, RetentionPolicy, RetentionRule,
};
pub use tasks::{ExternalTaskExecutor, Task, TaskExecutor, TaskKind, TaskQueue};
pub use window::WorkWindow;
