pub mod error;
pub mod lock;
pub mod logging;
pub mod timestamp;

pub use error::{ConfigError, RecorderError, RecorderResult};
pub use logging::{CameraLogFile, ComponentLogger, LogContext};
pub use timestamp::{format_day, now_local, parse_clock_time, parse_day};
