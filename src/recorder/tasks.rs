use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use futures::future::BoxFuture;

use super::layout::RecordingLayout;
use crate::core::error::RecorderError;
use crate::core::timestamp::format_day;

/// Cool-down before a queued task becomes eligible, and after each finished
/// task before the next head may run.
pub const TASK_DELAY_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Segment,
    Motion,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Segment => "segment",
            TaskKind::Motion => "motion",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub kind: TaskKind,
    pub camera: String,
    pub day: NaiveDate,
    pub recording_dir: PathBuf,
    pub motion_dir: Option<PathBuf>,
    /// Move extracted clips out of the day folder instead of copying.
    pub motion_move: bool,
    pub auto_clean: bool,
    pub hard_clean: bool,
    pub not_before: NaiveDateTime,
}

impl Task {
    /// The segment/motion pair for one finished camera day, in that order.
    pub fn pair_for(
        layout: &RecordingLayout,
        camera: &str,
        day: NaiveDate,
        now: NaiveDateTime,
    ) -> [Task; 2] {
        let recording_dir = layout.day_dir(camera, day);
        let not_before = now + TimeDelta::seconds(TASK_DELAY_SECS);
        [
            Task {
                kind: TaskKind::Segment,
                camera: camera.to_string(),
                day,
                recording_dir: recording_dir.clone(),
                motion_dir: None,
                motion_move: false,
                auto_clean: true,
                hard_clean: false,
                not_before,
            },
            Task {
                kind: TaskKind::Motion,
                camera: camera.to_string(),
                day,
                recording_dir,
                motion_dir: Some(layout.motion_dir(camera)),
                motion_move: true,
                auto_clean: true,
                hard_clean: true,
                not_before,
            },
        ]
    }

    pub fn label(&self) -> String {
        format!("{} {} {}", self.kind, self.camera, format_day(self.day))
    }
}

/// FIFO of post-processing tasks. Only the head is ever considered.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn head(&self) -> Option<&Task> {
        self.tasks.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Dequeues the head if its cool-down has elapsed.
    pub fn pop_eligible(&mut self, now: NaiveDateTime) -> Option<Task> {
        match self.tasks.front() {
            Some(head) if now > head.not_before => self.tasks.pop_front(),
            _ => None,
        }
    }

    pub fn delay_head(&mut self, not_before: NaiveDateTime) -> bool {
        match self.tasks.front_mut() {
            Some(head) => {
                head.not_before = not_before;
                true
            }
            None => false,
        }
    }
}

/// Runs one dequeued task to completion.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Task) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// Hands each task to an external program:
/// `<program> <kind> <camera> <YYYYMMDD> <recording_dir> [motion_dir [--move]] --auto-clean[=hard]`.
/// Without a program the task is only logged.
pub struct ExternalTaskExecutor {
    program: Option<PathBuf>,
}

impl ExternalTaskExecutor {
    pub fn new(program: Option<PathBuf>) -> Self {
        Self { program }
    }

    pub fn args_for(task: &Task) -> Vec<String> {
        let mut args = vec![
            task.kind.to_string(),
            task.camera.clone(),
            format_day(task.day),
            task.recording_dir.display().to_string(),
        ];
        if let Some(motion_dir) = &task.motion_dir {
            args.push(motion_dir.display().to_string());
            if task.motion_move {
                args.push("--move".to_string());
            }
        }
        if task.auto_clean {
            args.push(if task.hard_clean {
                "--auto-clean=hard".to_string()
            } else {
                "--auto-clean".to_string()
            });
        }
        args
    }
}

impl TaskExecutor for ExternalTaskExecutor {
    fn execute(&self, task: Task) -> BoxFuture<'static, anyhow::Result<()>> {
        let program = self.program.clone();
        Box::pin(async move {
            let Some(program) = program else {
                log::info!("[task] no executor configured, skipping {}", task.label());
                return Ok(());
            };

            let status = tokio::process::Command::new(&program)
                .args(Self::args_for(&task))
                .status()
                .await
                .map_err(|source| RecorderError::Spawn {
                    program: program.display().to_string(),
                    source,
                })?;

            if !status.success() {
                return Err(RecorderError::CommandFailed {
                    program: program.display().to_string(),
                    status: status.to_string(),
                }
                .into());
            }
            Ok(())
        })
    }
}
