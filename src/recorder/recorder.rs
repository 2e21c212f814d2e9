// src/recorder/recorder.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};

use super::fleet::{FleetExit, FleetMessage, FleetReceivers, FleetScheduler};
use crate::config::ConfigSource;
use crate::core::timestamp::now_local;

/// Extra wait on top of the process stop timeout for the last exit events.
const EXIT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub tick_interval: Duration,
    pub stale_poll_interval: Duration,
    pub reconcile_interval: Duration,
    pub stop_timeout: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            stale_poll_interval: Duration::from_secs(60),
            reconcile_interval: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// Drives the fleet until shutdown is requested or the campaign ends.
///
/// `running` is the ctrl-c flag; it is checked on every wakeup, so the loop
/// notices it within one tick.
pub async fn run_recorder(
    mut fleet: FleetScheduler,
    mut receivers: FleetReceivers,
    mut source: Option<Box<dyn ConfigSource>>,
    cfg: RecorderConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<FleetExit> {
    fleet.start(now_local()).await;

    let mut tick = interval(cfg.tick_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stale = interval_at(
        Instant::now() + cfg.stale_poll_interval,
        cfg.stale_poll_interval,
    );
    stale.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reconcile = interval_at(
        Instant::now() + cfg.reconcile_interval,
        cfg.reconcile_interval,
    );
    reconcile.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exit = loop {
        if !running.load(Ordering::SeqCst) {
            break FleetExit::Shutdown;
        }
        if let Some(exit) = fleet.exit_reason() {
            break exit;
        }

        tokio::select! {
            _ = tick.tick() => fleet.tick(now_local()),
            _ = stale.tick() => fleet.check_stale_days(now_local()),
            _ = reconcile.tick(), if source.is_some() => {
                if let Some(source) = source.as_mut() {
                    match source.poll() {
                        Ok(snapshot) => {
                            if let Err(err) = fleet.reconcile(&snapshot, now_local()) {
                                log::warn!("[recorder] snapshot {} rejected: {}", snapshot.revision, err);
                            }
                        }
                        Err(err) => log::warn!("[recorder] configuration not applied: {}", err),
                    }
                }
            }
            Some(event) = receivers.process.recv() => {
                fleet.handle(FleetMessage::Process(event), now_local());
            }
            Some(message) = receivers.inbox.recv() => fleet.handle(message, now_local()),
        }
    };

    log::info!("[recorder] leaving: {:?}", exit);
    fleet.stop(now_local());

    let deadline = Instant::now() + cfg.stop_timeout + EXIT_GRACE;
    while !fleet.all_stopped() {
        match tokio::time::timeout_at(deadline, receivers.process.recv()).await {
            Ok(Some(event)) => fleet.handle(FleetMessage::Process(event), now_local()),
            Ok(None) => break,
            Err(_) => {
                log::warn!("[recorder] monitors still stopping after {:?}", cfg.stop_timeout);
                break;
            }
        }
    }

    Ok(exit)
}
