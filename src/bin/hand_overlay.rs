use anyhow::{Context, Result};
use chrono::Local;

use handsense_viewer::config::Config;
use handsense_viewer::pipeline::{FramePipeline, FramePump, RateCounter, TickOutcome};
use handsense_viewer::projection::load_calibration;
use handsense_viewer::render::{Key, MinifbRenderer};
use handsense_viewer::sensor::SyntheticSession;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load_or_default(CONFIG_PATH);
    println!("=== Hand Overlay ({}) ===", env!("GIT_VERSION"));
    println!("Color: {}x{} @ {}fps",
        config.stream.color_width, config.stream.color_height, config.stream.color_fps);
    println!("Target FPS: {}", config.app.target_fps);
    println!("Mirror: {}", if config.device.mirror { "ON" } else { "OFF" });
    println!("Trace dir: {:?}", config.trace.output_dir());
    println!();
    println!("操作: [L] ロギング開始/停止  [Esc] 終了");
    println!();

    let mut session = SyntheticSession::animated();
    if let Some(path) = &config.app.calibration_path {
        session = session.with_calibration(load_calibration(path)?);
    }

    let mut pipeline = FramePipeline::from_config(Box::new(session), &config, Local::now())
        .context("Failed to initialize sensor session")?;
    let color = pipeline.context().color_profile();
    let mut renderer = MinifbRenderer::new(
        "Hand Overlay",
        color.width as usize,
        color.height as usize,
    )?;

    let mut pump = FramePump::new(config.app.target_fps);
    let mut rate = RateCounter::new();

    while renderer.is_open() {
        pump.wait();

        // トグルは次のティックの書き込みより前に反映する
        if renderer.is_key_pressed(Key::L) {
            let enable = !pipeline.trace().is_active();
            match pipeline.set_logging(enable) {
                Ok(()) => log::info!("logging {}", if enable { "ON" } else { "OFF" }),
                Err(e) => log::error!("logging toggle failed: {}", e),
            }
        }

        match pipeline.tick(&mut renderer) {
            Ok(TickOutcome::Rendered(report)) => {
                for name in &report.gestures {
                    log::info!("gesture fired: {}", name);
                }
            }
            Ok(TickOutcome::Skipped(status)) => {
                log::debug!("tick skipped: {}", status);
            }
            Err(e) => {
                log::error!("pipeline stopped: {}", e);
                break;
            }
        }
        renderer.update()?;

        if let Some(fps) = rate.tick() {
            log::debug!("FPS: {:.1}", fps);
        }
    }

    log::info!("Shutting down...");
    pipeline.shutdown();
    Ok(())
}
