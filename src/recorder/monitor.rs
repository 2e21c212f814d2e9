//! Per-camera recording state machine.
//!
//! The monitor is passive: the fleet calls [`CameraMonitor::tick`] once per
//! second and forwards the owned process' events through
//! [`CameraMonitor::on_process_event`]. Every method takes the current local
//! time explicitly, delayed actions are kept as due times and fired by a
//! later tick.

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tokio::sync::mpsc::UnboundedSender;

use super::layout::{RAW_SEGMENT_PATTERN, RecordingLayout};
use super::window::WorkWindow;
use crate::config::{Camera, Campaign};
use crate::core::logging::{CameraLogFile, ComponentLogger, LogContext};
use crate::core::timestamp::now_local;
use crate::process::{ProcessEventKind, ProcessHandle, ProcessState};

pub const RESPAWN_DELAY_SECS: i64 = 3;
pub const HANG_TIMEOUT_SECS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorState {
    Stopped,
    Sleeping,
    Running,
    ToSleeping,
    Stopping,
    Restarting,
    Error,
}

impl MonitorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorState::Stopped => "stopped",
            MonitorState::Sleeping => "sleeping",
            MonitorState::Running => "running",
            MonitorState::ToSleeping => "to_sleeping",
            MonitorState::Stopping => "stopping",
            MonitorState::Restarting => "restarting",
            MonitorState::Error => "error",
        }
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEventKind {
    Log(String),
    State(MonitorState),
    FfmpegLog(String),
    Error(String),
    Stop,
    /// Recording day finished; carries the completed day.
    Sleep(NaiveDate),
    /// The bounded campaign is over. Fatal for the whole fleet.
    CampaignEnded,
    /// Day directory the monitor is about to record into. The owner
    /// creates it off the control loop.
    DayDir(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEvent {
    pub camera: String,
    pub kind: MonitorEventKind,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub segment_secs: u32,
    pub campaign: Option<Campaign>,
    /// Monitor lines at `info` instead of `debug`.
    pub verbose: bool,
    pub file_log: bool,
}

pub struct CameraMonitor {
    camera: Camera,
    window: WorkWindow,
    layout: RecordingLayout,
    settings: MonitorSettings,
    state: MonitorState,
    this_day: Option<NaiveDate>,
    finished_day: Option<NaiveDate>,
    campaign_cursor: Option<NaiveDate>,
    campaign_over: bool,
    pending_spawn: Option<NaiveDateTime>,
    polling: bool,
    process: Box<dyn ProcessHandle>,
    events: UnboundedSender<MonitorEvent>,
    log_file: Option<CameraLogFile>,
}

impl ComponentLogger for CameraMonitor {
    fn log_context(&self) -> LogContext {
        LogContext::new("monitor", &self.camera.name)
    }
}

impl CameraMonitor {
    pub fn new(
        camera: Camera,
        layout: RecordingLayout,
        settings: MonitorSettings,
        process: Box<dyn ProcessHandle>,
        events: UnboundedSender<MonitorEvent>,
    ) -> Self {
        let log_file = settings
            .file_log
            .then(|| CameraLogFile::new(layout.camera_log(&camera.name)));

        Self {
            window: WorkWindow::new(camera.start, camera.stop),
            camera,
            layout,
            settings,
            state: MonitorState::Stopped,
            this_day: None,
            finished_day: None,
            campaign_cursor: None,
            campaign_over: false,
            pending_spawn: None,
            polling: false,
            process,
            events,
            log_file,
        }
    }

    pub fn name(&self) -> &str {
        &self.camera.name
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn current_day(&self) -> Option<NaiveDate> {
        self.this_day
    }

    pub fn finished_day(&self) -> Option<NaiveDate> {
        self.finished_day
    }

    pub fn campaign_cursor(&self) -> Option<NaiveDate> {
        self.campaign_cursor
    }

    pub fn respawn_pending(&self) -> bool {
        self.pending_spawn.is_some()
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn today_dir(&self) -> Option<PathBuf> {
        self.this_day
            .map(|day| self.layout.day_dir(&self.camera.name, day))
    }

    /// Arguments for the recorder process. Output names follow
    /// [`RAW_SEGMENT_PATTERN`] inside the day directory.
    pub fn spawn_args(&self) -> Vec<String> {
        let segment_time = self.settings.segment_secs.to_string();
        [
            "-y",
            "-i",
            self.camera.address.as_str(),
            "-c:v",
            "libx264",
            "-f",
            "segment",
            "-segment_time",
            segment_time.as_str(),
            "-reset_timestamps",
            "1",
            "-probesize",
            "3000",
            "-strftime",
            "1",
            RAW_SEGMENT_PATTERN,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub fn start(&mut self, now: NaiveDateTime) {
        let today = now.date();
        self.emit(MonitorEventKind::DayDir(
            self.layout.day_dir(&self.camera.name, today),
        ));

        self.log("Monitor start");
        self.this_day = Some(today);
        self.campaign_over = false;
        if let Some(campaign) = self.settings.campaign {
            self.campaign_cursor = Some(campaign.start.map_or(today, |start| start.max(today)));
        }
        self.polling = true;
        self.change_state(MonitorState::Sleeping);
    }

    /// Proceeds from any state, including states that have no running
    /// process; the handle reports an immediate exit in that case.
    pub fn stop(&mut self) {
        self.change_state(MonitorState::Stopping);
        self.process.stop();
        self.polling = false;
        self.pending_spawn = None;
    }

    pub fn tick(&mut self, now: NaiveDateTime) {
        if !self.polling || self.state == MonitorState::Stopped {
            return;
        }

        self.fire_pending_spawn(now);
        self.check_hang(now);

        let today = now.date();
        if let Some(campaign) = self.settings.campaign {
            if today > campaign.end {
                if !self.campaign_over {
                    self.campaign_over = true;
                    self.log("Day passed. Closing socket to record");
                    self.emit(MonitorEventKind::CampaignEnded);
                }
                return;
            }
            let cursor = self.campaign_cursor.get_or_insert(today);
            if *cursor < today {
                // a day that never closed cannot be paced any more
                *cursor = today;
            }
            if *cursor != today {
                return;
            }
        }

        self.evaluate_day(now, today);
    }

    pub fn on_process_event(&mut self, kind: ProcessEventKind, now: NaiveDateTime) {
        match kind {
            ProcessEventKind::Start => self.log("ffmpeg processing started ..."),
            ProcessEventKind::Log(line) => {
                self.debug(&format!("ffmpeg {}", line));
                if let Some(file) = &self.log_file {
                    file.append(now_local(), &format!("ffmpeg {}", line));
                }
                self.emit(MonitorEventKind::FfmpegLog(line));
            }
            ProcessEventKind::Error(payload) => {
                self.log("ffmpeg error");
                self.log(&payload);
                self.change_state(MonitorState::Error);
                self.emit(MonitorEventKind::Error(payload));
            }
            ProcessEventKind::Crash => {
                self.log(&format!("ffmpeg crash {}", self.process.status().crash_count));
                if self.state == MonitorState::Running {
                    self.schedule_respawn(now);
                }
            }
            ProcessEventKind::Exit => match self.state {
                MonitorState::Stopping => {
                    self.change_state(MonitorState::Stopped);
                    self.emit(MonitorEventKind::Stop);
                }
                MonitorState::Restarting => {
                    self.schedule_respawn(now);
                    self.change_state(MonitorState::Running);
                }
                MonitorState::ToSleeping => {
                    self.change_state(MonitorState::Sleeping);
                    if let Some(day) = self.finished_day {
                        self.emit(MonitorEventKind::Sleep(day));
                    }
                }
                _ => {}
            },
        }
    }

    fn evaluate_day(&mut self, now: NaiveDateTime, today: NaiveDate) {
        if self.this_day != Some(today) {
            self.this_day = Some(today);
            self.emit(MonitorEventKind::DayDir(
                self.layout.day_dir(&self.camera.name, today),
            ));
            if self.state == MonitorState::Running {
                self.change_state(MonitorState::Restarting);
                self.process.stop();
            }
            return;
        }

        let in_window = self.window.contains(now.time());
        match self.state {
            MonitorState::Running if !in_window => {
                self.finished_day = self.this_day;
                self.change_state(MonitorState::ToSleeping);
                // pace from the day this window opened, a window that wraps
                // midnight closes on the following morning
                if let Some(cursor) = self.campaign_cursor.as_mut() {
                    *cursor = self.window.opened_on(now) + TimeDelta::days(1);
                }
                self.process.stop();
            }
            MonitorState::Sleeping if in_window => {
                self.schedule_respawn(now);
                self.change_state(MonitorState::Running);
            }
            _ => {}
        }
    }

    fn check_hang(&mut self, now: NaiveDateTime) {
        if self.state != MonitorState::Running {
            return;
        }
        let status = self.process.status();
        if status.state != ProcessState::Running {
            return;
        }
        if let Some(last) = status.last_frame_at {
            if now - last > TimeDelta::seconds(HANG_TIMEOUT_SECS) {
                self.log("ffmpeg hangs");
                self.change_state(MonitorState::Restarting);
                self.process.stop();
            }
        }
    }

    fn schedule_respawn(&mut self, now: NaiveDateTime) {
        self.pending_spawn = Some(now + TimeDelta::seconds(RESPAWN_DELAY_SECS));
    }

    fn fire_pending_spawn(&mut self, now: NaiveDateTime) {
        let Some(due) = self.pending_spawn else {
            return;
        };
        if now < due {
            return;
        }
        self.pending_spawn = None;

        if self.state != MonitorState::Running {
            self.debug(&format!("dropping respawn, state is {}", self.state));
            return;
        }
        self.respawn();
    }

    fn respawn(&mut self) {
        let Some(dir) = self.today_dir() else {
            return;
        };
        self.log("reSpawn");
        let args = self.spawn_args();
        if let Err(err) = self.process.spawn(&args, &dir) {
            self.log(&format!("spawn failed: {}", err));
        }
    }

    fn change_state(&mut self, state: MonitorState) {
        self.state = state;
        self.log(&format!("state: {}", state));
        self.emit(MonitorEventKind::State(state));
    }

    fn log(&self, message: &str) {
        if self.settings.verbose {
            self.info(message);
        } else {
            self.debug(message);
        }
        if let Some(file) = &self.log_file {
            file.append(now_local(), message);
        }
        self.emit(MonitorEventKind::Log(message.to_string()));
    }

    fn emit(&self, kind: MonitorEventKind) {
        let _ = self.events.send(MonitorEvent {
            camera: self.camera.name.clone(),
            kind,
        });
    }
}
