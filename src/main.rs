// src/main.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use camfleet::config::{self, ConfigSource, FileConfigSource};
use camfleet::process::FfmpegFactory;
use camfleet::recorder::catalog;
use camfleet::recorder::{
    DayMarkerStore, ExternalTaskExecutor, FleetScheduler, FleetServices, FleetSettings,
    JsonCatalog, RecorderConfig, RecordingLayout, RetentionPolicy, run_recorder,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // ------------------------------------------------------------
    // Config
    // ------------------------------------------------------------
    let cfg_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".into());

    let cfg = config::load(&cfg_path)?;
    let cameras = cfg.validated_cameras()?;
    info!(
        "[camfleet] loaded {} ({} cameras, recordings in {})",
        cfg_path,
        cameras.len(),
        cfg.recording_dir().display()
    );

    // ------------------------------------------------------------
    // Graceful shutdown
    // ------------------------------------------------------------
    let running = Arc::new(AtomicBool::new(true));
    {
        let r = running.clone();
        ctrlc::set_handler(move || {
            info!("[camfleet] shutdown requested");
            r.store(false, Ordering::SeqCst);
        })?;
    }

    // ------------------------------------------------------------
    // Fleet
    // ------------------------------------------------------------
    let recording_dir = cfg.recording_dir();
    std::fs::create_dir_all(&recording_dir)?;

    let camera_names: Vec<String> = cameras.iter().map(|c| c.name.clone()).collect();
    let services = FleetServices {
        catalog: catalog::shared(JsonCatalog::new(
            RecordingLayout::new(&recording_dir),
            &cfg.catalog_name,
            &camera_names,
        )),
        factory: Arc::new(FfmpegFactory::new(&cfg.ffmpeg_bin, cfg.stop_timeout())),
        executor: Arc::new(ExternalTaskExecutor::new(cfg.task_program.clone())),
        markers: DayMarkerStore::new(cfg.convert_day_path()),
    };

    let source = FileConfigSource::new(&cfg_path, &cfg)?;
    let (mut fleet, receivers) = FleetScheduler::new(
        FleetSettings::from_config(&cfg)?,
        cameras,
        RetentionPolicy::new(cfg.retention.clone()),
        services,
    );
    fleet.mark_applied(source.current().revision);

    let recorder_cfg = RecorderConfig {
        reconcile_interval: cfg.reconcile_interval(),
        stop_timeout: cfg.stop_timeout(),
        ..RecorderConfig::default()
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let source: Box<dyn ConfigSource> = Box::new(source);
    let exit = runtime.block_on(run_recorder(
        fleet,
        receivers,
        Some(source),
        recorder_cfg,
        running,
    ))?;

    info!("[camfleet] stopped: {:?}", exit);
    Ok(())
}
