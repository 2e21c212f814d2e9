// src/lib.rs
pub mod config;
pub mod core;
pub mod process;
pub mod recorder;
pub mod testing;

// Re-export the most commonly used types
pub use crate::config::{Camera, FleetConfig, FleetSnapshot};
pub use crate::core::{ComponentLogger, LogContext};
pub use crate::recorder::{FleetExit, FleetScheduler, run_recorder};
