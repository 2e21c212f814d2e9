//! Doubles for exercising the fleet without cameras or ffmpeg.

pub mod mocks;

pub use mocks::{MemoryCatalog, MockProcess, MockProcessFactory, MockProcessProbe};
