mod pacer;
mod script;
mod settings;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use pacer::FramePacer;
use script::{parse_hex_bytes, KeyScript};
use serde_json::json;
use settings::Settings;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use vdp_adapter::{VdpAdapter, VdpBoundary};
use vdp_core::logging::{LogCategory, LogConfig, LogLevel};
use vdp_core::types::{BYTES_PER_PIXEL, MAX_FRAMEBUFFER_BYTES};
use vdp_soft::{ScanoutPattern, SoftVdp};

#[derive(Parser)]
#[command(about = "Headless host for the reference VDP")]
struct Args {
    /// Number of frames to run
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Screen mode to start in (overrides config)
    #[arg(long)]
    mode: Option<u32>,

    /// Frame rate in Hz (overrides config)
    #[arg(long)]
    fps: Option<f64>,

    /// Run frames back to back instead of pacing to real time
    #[arg(long, default_value_t = false)]
    fast: bool,

    /// Scanout pattern: "static" or "frame-stamp"
    #[arg(long, default_value = "static")]
    pattern: String,

    /// Scripted key as FRAME:CODE[:down|up], CODE in hex. Repeatable
    #[arg(long = "key", value_name = "FRAME:CODE")]
    keys: Vec<String>,

    /// Hex bytes sent to the VDP before the first frame, e.g. "16 12"
    #[arg(long)]
    send: Option<String>,

    /// Write the last frame to this PNG file
    #[arg(long)]
    png: Option<PathBuf>,

    /// Write the final debug state to this file as JSON
    #[arg(long)]
    state: Option<PathBuf>,

    /// Settings file (default: config.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the effective settings back to the settings file
    #[arg(long, default_value_t = false)]
    write_config: bool,

    /// Level for all VDP log categories (off, error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Per-category level as CATEGORY=LEVEL. Repeatable
    #[arg(long = "log", value_name = "CATEGORY=LEVEL")]
    log_categories: Vec<String>,

    /// Append VDP logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose VDP command logging
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Suppress the end-of-run summary
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

/// Fold command line overrides into the loaded settings.
fn merge_settings(mut settings: Settings, args: &Args) -> Settings {
    if args.mode.is_some() {
        settings.startup_mode = args.mode;
    }
    if let Some(fps) = args.fps {
        settings.frame_rate_hz = fps;
    }
    if let Some(level) = &args.log_level {
        settings.log.global = level.clone();
    }
    for entry in &args.log_categories {
        match entry.split_once('=') {
            Some((cat, level)) => {
                settings
                    .log
                    .categories
                    .insert(cat.to_lowercase(), level.to_string());
            }
            None => warn!("ignoring --log '{}', expected CATEGORY=LEVEL", entry),
        }
    }
    if args.log_file.is_some() {
        settings.log.file = args.log_file.clone();
    }
    settings
}

fn configure_logging(settings: &Settings) -> Result<()> {
    let config = LogConfig::global();
    let global = LogLevel::from_str(&settings.log.global)
        .ok_or_else(|| anyhow!("unknown log level '{}'", settings.log.global))?;
    config.set_global_level(global);

    for (name, level) in &settings.log.categories {
        let category = LogCategory::from_str(name)
            .ok_or_else(|| anyhow!("unknown log category '{}'", name))?;
        let level =
            LogLevel::from_str(level).ok_or_else(|| anyhow!("unknown log level '{}'", level))?;
        config.set_level(category, level);
    }
    config.set_rate_limit(settings.log.rate_limit);

    if let Some(path) = &settings.log.file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("failed to open log file {}", path.display()))?;
    }
    Ok(())
}

struct RunOutcome {
    width: u32,
    height: u32,
    frame: Vec<u8>,
    mode_changes: u32,
    received: Vec<u8>,
}

/// The host side of the frame loop: vsync, vblank, input, capture.
fn run_frames(
    adapter: &VdpAdapter<SoftVdp>,
    frames: u32,
    script: &KeyScript,
    mut pacer: Option<FramePacer>,
    vsync: &AtomicU64,
) -> Result<RunOutcome> {
    let mut buffer = vec![0u8; MAX_FRAMEBUFFER_BYTES];
    let mut geometry = (0, 0);
    let mut mode_changes = 0;
    let mut received = Vec::new();

    for frame in 1..=frames {
        if let Some(pacer) = pacer.as_mut() {
            pacer.wait();
        }
        vsync.fetch_add(1, Ordering::Relaxed);
        adapter.signal_vblank()?;

        for key in script.due(frame) {
            adapter.send_scancode(key.code, key.is_down)?;
        }

        let (width, height) = adapter.copy_framebuffer(&mut buffer)?;
        if (width, height) != geometry {
            if geometry != (0, 0) {
                mode_changes += 1;
            }
            info!("Mode change to {}x{}", width, height);
            geometry = (width, height);
        }

        while let Some(byte) = adapter.recv_byte()? {
            received.push(byte);
        }
        debug!("frame {}: {}x{}", frame, width, height);
    }

    let (width, height) = geometry;
    buffer.truncate(width as usize * height as usize * BYTES_PER_PIXEL);
    Ok(RunOutcome {
        width,
        height,
        frame: buffer,
        mode_changes,
        received,
    })
}

fn write_png(path: &Path, width: u32, height: u32, rgb: &[u8]) -> Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!("no frame captured (resolution was {}x{})", width, height);
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer
        .write_image_data(rgb)
        .with_context(|| format!("failed to write PNG: {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (config_path, loaded) = match &args.config {
        Some(path) => (path.clone(), Settings::load_from(path)),
        None => (Settings::config_path(), Settings::load()),
    };
    let settings = merge_settings(loaded, &args);
    configure_logging(&settings)?;
    if args.write_config {
        settings
            .save_to(&config_path)
            .map_err(|e| anyhow!("failed to save {}: {}", config_path.display(), e))?;
    }

    let pattern = ScanoutPattern::from_str(&args.pattern)
        .ok_or_else(|| anyhow!("unknown pattern '{}'", args.pattern))?;
    let script = KeyScript::parse(&args.keys)?;
    let preload = match &args.send {
        Some(hex) => parse_hex_bytes(hex)?,
        None => Vec::new(),
    };

    let mut adapter = VdpAdapter::new(SoftVdp::new().with_pattern(pattern));
    if let Some(mode) = settings.startup_mode {
        adapter
            .set_startup_mode(mode)
            .with_context(|| format!("cannot start in mode {}", mode))?;
    }
    adapter.set_debug_logging(args.debug);
    adapter.setup()?;
    for byte in preload {
        adapter.send_byte(byte)?;
    }
    if !script.is_empty() {
        info!("{} scripted key entries", args.keys.len());
    }

    let stop = AtomicBool::new(false);
    let vsync = AtomicU64::new(0);
    let tick_interval = Duration::from_micros(settings.vdp_tick_interval_us);
    let pacer = (!args.fast).then(|| FramePacer::new(settings.frame_rate_hz));

    let (outcome, ticks) = thread::scope(|s| -> Result<(RunOutcome, u64)> {
        let adapter = &adapter;
        let stop = &stop;
        let service = thread::Builder::new()
            .name("vdp-service".to_string())
            .spawn_scoped(s, move || -> vdp_core::Result<u64> {
                let mut ticks = 0;
                while !stop.load(Ordering::Acquire) {
                    adapter.tick()?;
                    ticks += 1;
                    thread::sleep(tick_interval);
                }
                Ok(ticks)
            })?;

        let outcome = run_frames(adapter, args.frames, &script, pacer, &vsync);
        stop.store(true, Ordering::Release);
        let ticks = service
            .join()
            .map_err(|_| anyhow!("VDP service thread panicked"))??;
        Ok((outcome?, ticks))
    })?;

    let vdp_status = adapter.with_subsystem(|vdp| vdp.status());
    adapter.shutdown()?;

    if let Some(path) = &args.png {
        write_png(path, outcome.width, outcome.height, &outcome.frame)?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = &args.state {
        let state = json!({
            "adapter": adapter.debug_state(),
            "vdp": vdp_status,
            "vsync": vsync.load(Ordering::Relaxed),
            "service_ticks": ticks,
            "mode_changes": outcome.mode_changes,
            "received": outcome.received,
        });
        let mut f = File::create(path)?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
    }

    // Close the log file; the writer drains what is queued
    LogConfig::global().clear_log_file();

    if !args.quiet {
        println!(
            "Ran {} frames, last frame {}x{}, {} mode changes, {} service ticks",
            vsync.load(Ordering::Relaxed),
            outcome.width,
            outcome.height,
            outcome.mode_changes,
            ticks
        );
        if !outcome.received.is_empty() {
            println!("VDP sent {:02X?}", outcome.received);
        }
    }

    Ok(())
}
