use anyhow::{Context, Result};
use chrono::Local;

use handsense_viewer::config::Config;
use handsense_viewer::pipeline::{FramePipeline, RateCounter, TickOutcome};
use handsense_viewer::projection::load_calibration;
use handsense_viewer::render::RecordingCanvas;
use handsense_viewer::sensor::SyntheticSession;

const CONFIG_PATH: &str = "config.toml";
const DEFAULT_TICKS: u64 = 300;

/// Usage: handsense-viewer [--log] [config.toml]
fn parse_args() -> (bool, String) {
    let mut logging = false;
    let mut config_path = CONFIG_PATH.to_string();
    for arg in std::env::args().skip(1) {
        if arg == "--log" {
            logging = true;
        } else {
            config_path = arg;
        }
    }
    (logging, config_path)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (logging, config_path) = parse_args();
    let mut config = Config::load_or_default(&config_path);
    config.trace.enabled |= logging;

    println!("=== HandSense Viewer ({}) ===", env!("GIT_VERSION"));
    println!("Color: {}x{} @ {}fps",
        config.stream.color_width, config.stream.color_height, config.stream.color_fps);
    println!("Depth: {}x{} @ {}fps",
        config.stream.depth_width, config.stream.depth_height, config.stream.depth_fps);
    println!("Gestures: {:?}", config.hand.gestures);
    println!("Trace: {} ({:?})",
        if config.trace.enabled { "ON" } else { "OFF" },
        config.trace.output_dir());
    println!("Error policy: {:?}", config.app.error_policy);
    println!("Ticks: {}", config.app.max_ticks.unwrap_or(DEFAULT_TICKS));
    println!();

    let mut session = SyntheticSession::animated();
    if let Some(path) = &config.app.calibration_path {
        let calibration = load_calibration(path)
            .with_context(|| format!("Failed to load calibration {}", path))?;
        session = session.with_calibration(calibration);
    }

    let session_start = Local::now();
    let mut pipeline = FramePipeline::from_config(Box::new(session), &config, session_start)
        .context("Failed to initialize sensor session")?;

    let mut canvas = RecordingCanvas::new();
    let mut rate = RateCounter::new();
    let max_ticks = config.app.max_ticks.unwrap_or(DEFAULT_TICKS);
    let (mut rendered, mut skipped, mut gestures) = (0u64, 0u64, 0usize);

    for _ in 0..max_ticks {
        match pipeline.tick(&mut canvas)? {
            TickOutcome::Rendered(report) => {
                rendered += 1;
                gestures += report.gestures.len();
                for name in &report.gestures {
                    log::info!("gesture fired: {}", name);
                }
            }
            TickOutcome::Skipped(status) => {
                skipped += 1;
                log::debug!("tick skipped: {}", status);
            }
        }
        if let Some(fps) = rate.tick() {
            log::info!("FPS: {:.1}", fps);
        }
    }

    if let Some(path) = pipeline.trace().path() {
        log::info!("trace: {} rows -> {}", pipeline.trace().rows_written(), path.display());
    }
    pipeline.shutdown();
    log::info!(
        "done: {} rendered, {} skipped, {} gestures",
        rendered,
        skipped,
        gestures
    );
    Ok(())
}
