use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::sync::oneshot;

use super::{
    ProcessEventKind, ProcessEventSink, ProcessFactory, ProcessHandle, ProcessState,
    ProcessStatus,
};
use crate::core::error::RecorderError;
use crate::core::lock::lock_mutex;
use crate::core::timestamp::now_local;

pub struct FfmpegFactory {
    binary: String,
    stop_timeout: Duration,
}

impl FfmpegFactory {
    pub fn new(binary: &str, stop_timeout: Duration) -> Self {
        Self {
            binary: binary.to_string(),
            stop_timeout,
        }
    }
}

impl ProcessFactory for FfmpegFactory {
    fn create(&self, sink: ProcessEventSink) -> Box<dyn ProcessHandle> {
        Box::new(FfmpegProcess::new(&self.binary, self.stop_timeout, sink))
    }
}

#[derive(Debug)]
struct Shared {
    state: ProcessState,
    last_frame_at: Option<NaiveDateTime>,
    crash_count: u32,
    stop_requested: bool,
}

/// Runs the recorder binary under tokio and reports its lifecycle.
pub struct FfmpegProcess {
    binary: String,
    stop_timeout: Duration,
    sink: ProcessEventSink,
    shared: Arc<Mutex<Shared>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl FfmpegProcess {
    pub fn new(binary: &str, stop_timeout: Duration, sink: ProcessEventSink) -> Self {
        Self {
            binary: binary.to_string(),
            stop_timeout,
            sink,
            shared: Arc::new(Mutex::new(Shared {
                state: ProcessState::Stopped,
                last_frame_at: None,
                crash_count: 0,
                stop_requested: false,
            })),
            stop_tx: None,
        }
    }
}

impl ProcessHandle for FfmpegProcess {
    fn spawn(&mut self, args: &[String], working_dir: &Path) -> anyhow::Result<()> {
        if lock_mutex(&self.shared, "ffmpeg.spawn").state == ProcessState::Running {
            return Err(RecorderError::AlreadyRunning {
                camera: self.sink.camera().to_string(),
            }
            .into());
        }

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = RecorderError::Spawn {
                    program: self.binary.clone(),
                    source,
                };
                self.sink.send(ProcessEventKind::Error(err.to_string()));
                return Err(err.into());
            }
        };

        {
            let mut shared = lock_mutex(&self.shared, "ffmpeg.spawn.started");
            shared.state = ProcessState::Running;
            shared.stop_requested = false;
            shared.last_frame_at = None;
        }
        self.sink.send(ProcessEventKind::Start);

        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_stderr(stderr, self.shared.clone(), self.sink.clone()));
        }
        let stdin = child.stdin.take();
        tokio::spawn(supervise(
            child,
            stdin,
            stop_rx,
            self.stop_timeout,
            self.shared.clone(),
            self.sink.clone(),
        ));

        Ok(())
    }

    fn stop(&mut self) {
        match self.stop_tx.take() {
            Some(tx) => {
                lock_mutex(&self.shared, "ffmpeg.stop").stop_requested = true;
                if tx.send(()).is_err() {
                    // supervisor already finished
                    self.sink.send(ProcessEventKind::Exit);
                }
            }
            // nothing to stop, report the exit right away
            None => self.sink.send(ProcessEventKind::Exit),
        }
    }

    fn status(&self) -> ProcessStatus {
        let shared = lock_mutex(&self.shared, "ffmpeg.status");
        ProcessStatus {
            state: shared.state,
            last_frame_at: shared.last_frame_at,
            crash_count: shared.crash_count,
        }
    }
}

async fn supervise(
    mut child: Child,
    mut stdin: Option<ChildStdin>,
    stop_rx: oneshot::Receiver<()>,
    stop_timeout: Duration,
    shared: Arc<Mutex<Shared>>,
    sink: ProcessEventSink,
) {
    let requested = tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) => log::debug!("[ffmpeg:{}] exited with {}", sink.camera(), status),
                Err(err) => log::warn!("[ffmpeg:{}] wait failed: {}", sink.camera(), err),
            }
            false
        }
        // a dropped handle counts as a stop request
        _ = stop_rx => true,
    };

    if requested {
        if let Some(mut pipe) = stdin.take() {
            let _ = pipe.write_all(b"q").await;
            let _ = pipe.flush().await;
        }
        if tokio::time::timeout(stop_timeout, child.wait()).await.is_err() {
            log::warn!(
                "[ffmpeg:{}] no exit after {:?}, killing",
                sink.camera(),
                stop_timeout
            );
            if let Err(err) = child.kill().await {
                log::error!("[ffmpeg:{}] kill failed: {}", sink.camera(), err);
            }
        }
    }
    drop(stdin);

    let kind = {
        let mut shared = lock_mutex(&shared, "ffmpeg.supervise.exit");
        shared.state = ProcessState::Stopped;
        if requested || shared.stop_requested {
            ProcessEventKind::Exit
        } else {
            shared.crash_count += 1;
            ProcessEventKind::Crash
        }
    };
    sink.send(kind);
}

/// ffmpeg ends progress lines with `\r`, so both separators split.
async fn read_stderr(stderr: ChildStderr, shared: Arc<Mutex<Shared>>, sink: ProcessEventSink) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();

    loop {
        let chunk = match reader.fill_buf().await {
            Ok([]) | Err(_) => break,
            Ok(chunk) => chunk,
        };
        let len = chunk.len();
        for &b in chunk {
            if b == b'\n' || b == b'\r' {
                handle_line(&mut line, &shared, &sink);
            } else {
                line.push(b);
            }
        }
        reader.consume(len);
    }
    handle_line(&mut line, &shared, &sink);
}

fn handle_line(buf: &mut Vec<u8>, shared: &Arc<Mutex<Shared>>, sink: &ProcessEventSink) {
    if buf.is_empty() {
        return;
    }
    let line = String::from_utf8_lossy(buf).trim().to_string();
    buf.clear();
    if line.is_empty() {
        return;
    }

    if line.starts_with("frame=") {
        lock_mutex(shared, "ffmpeg.progress").last_frame_at = Some(now_local());
    } else {
        sink.send(ProcessEventKind::Log(line));
    }
}
