use std::error::Error as StdError;
use std::path::PathBuf;
use thiserror::Error;

pub type RecorderResult<T> = Result<T, RecorderError>;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("{message}")]
    Message { message: String },
    #[error("failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("recorder process for '{camera}' is already running")]
    AlreadyRunning { camera: String },
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command '{program}' exited with {status}")]
    CommandFailed { program: String, status: String },
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl RecorderError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn with_context(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        RecorderError::Context {
            context: context.into(),
            source: source.into().into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{message}")]
    Message { message: String },
    #[error("duplicate camera name '{name}'")]
    DuplicateCamera { name: String },
    #[error("camera #{index} has an empty name")]
    EmptyCameraName { index: usize },
    #[error("camera '{camera}': invalid {field} time '{value}' (expected HH:MM[:SS])")]
    InvalidClockTime {
        camera: String,
        field: &'static str,
        value: String,
    },
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl ConfigError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Context {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
