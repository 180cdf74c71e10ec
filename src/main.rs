//! video-ocr - Live video text recognition
//!
//! Captures frames continuously, periodically runs text recognition on the
//! configured regions of a frame, and reports what it reads. Recognition runs
//! on a worker thread and never holds up capture.

mod analysis;
mod app;
mod capture;
mod config;
mod hotkey;
mod overlay;
mod regions;
mod shared;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::{PipelineCoordinator, PipelineSettings};
use crate::config::AppConfig;
use crate::hotkey::Key;
use crate::overlay::{DisplaySurface, HeadlessDisplay};
use crate::regions::{Region, RegionModel};
use crate::shared::{ConsoleSink, PipelineState};

/// video-ocr - OCR regions of a live video source
#[derive(Parser, Debug)]
#[command(name = "video-ocr")]
#[command(about = "Periodically recognizes text in regions of a live video source")]
struct Args {
    /// Input source: "synthetic", an image file or directory, a camera index
    /// or a video file
    #[arg(short = 'f', long)]
    source: Option<String>,

    /// Restart an image sequence at its end
    #[arg(long = "loop")]
    loop_images: bool,

    /// Minimum number of frames between OCR runs
    #[arg(short = 'i', long)]
    interval: Option<u32>,

    /// Sleep milliseconds between frames
    #[arg(short = 's', long)]
    sleep: Option<u64>,

    /// Comma-separated list of recognition languages
    #[arg(short = 'l', long)]
    languages: Option<String>,

    /// Width of the video capture
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Height of the video capture
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Capture FPS
    #[arg(long)]
    fps: Option<u32>,

    /// Image scale for feeding OCR [0.1-1]
    #[arg(short = 'q', long)]
    scale: Option<f64>,

    /// Region to OCR in the form of x,y,w,h (repeatable)
    #[arg(short = 'r', long = "region")]
    regions: Vec<Region>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Start with the periodic stats report hidden
    #[arg(long)]
    no_stats: bool,

    /// Configuration file (default: config.toml in the user config directory)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Recognition engine: "tesseract" or "none"
    #[arg(long)]
    engine: Option<String>,

    /// tessdata directory
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Ignore stdin commands when headless
    #[arg(long)]
    no_console: bool,

    /// Write the latest annotated frame to this PNG file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Log the negotiated capture properties at startup
    #[arg(long)]
    show_capture_props: bool,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Args {
    /// Override configuration values with the flags that were given
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(source) = &self.source {
            config.capture.source = source.clone();
        }
        if let Some(interval) = self.interval {
            config.ocr.interval_frames = interval;
        }
        if let Some(sleep) = self.sleep {
            config.capture.frame_delay_ms = sleep;
        }
        if let Some(languages) = &self.languages {
            config.ocr.languages = crate::config::parse_languages(languages);
        }
        if let Some(width) = self.width {
            config.capture.width = width;
        }
        if let Some(height) = self.height {
            config.capture.height = height;
        }
        if let Some(fps) = self.fps {
            config.capture.fps = fps;
        }
        if let Some(scale) = self.scale {
            config.ocr.scale = scale;
        }
        if !self.regions.is_empty() {
            config.ocr.regions = self.regions.iter().map(Region::to_string).collect();
        }
        if self.verbose {
            config.general.verbose = true;
        }
        if self.no_stats {
            config.general.stats_hidden = true;
        }
        if self.loop_images {
            config.capture.loop_images = true;
        }
        if let Some(engine) = &self.engine {
            config.ocr.engine = engine.clone();
        }
        if let Some(tessdata) = &self.tessdata {
            config.ocr.tessdata = Some(tessdata.clone());
        }
        if self.headless {
            config.ui.window = false;
        }
        if self.no_console {
            config.ui.console_input = false;
        }
        if let Some(snapshot) = &self.snapshot {
            config.ui.snapshot_path = Some(snapshot.clone());
        }
        if let Some(max_frames) = self.max_frames {
            config.capture.max_frames = max_frames;
        }
        if self.show_capture_props {
            config.capture.show_properties = true;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_path) = load_or_default_config(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.normalize();

    // Initialize logging
    let level = if config.general.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &config_path {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("Using default configuration"),
    }

    if let Some(path) = &args.save_config {
        crate::config::save_config(&config, path)
            .with_context(|| format!("Failed to write configuration to {:?}", path))?;
        info!("Configuration written to {:?}", path);
        return Ok(());
    }

    config.validate()?;
    run(&config)?;

    info!("video-ocr shutdown complete");
    Ok(())
}

/// Load `--config`, else the user config file if present, else defaults
fn load_or_default_config(explicit: Option<&std::path::Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        return Ok((config, Some(path.to_path_buf())));
    }

    if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            let config = config::load_config(&config_path)?;
            return Ok((config, Some(config_path)));
        }
    }

    Ok((AppConfig::default(), None))
}

/// Open the collaborators and run the pipeline to completion
fn run(config: &AppConfig) -> Result<()> {
    let settings = PipelineSettings::from_config(config)?;
    let regions = RegionModel::with_regions(config.parse_regions()?);

    // Open the video source and initialize it
    let mut source = capture::open_source(&config.capture.source, config.capture.loop_images)
        .with_context(|| format!("Error opening video source {}", config.capture.source))?;
    if let Some(fps) = capture::configure(
        source.as_mut(),
        config.capture.width,
        config.capture.height,
        config.capture.fps,
    ) {
        info!("Capturing at {} fps", fps);
    }
    if config.capture.show_properties {
        capture::log_properties(source.as_ref());
    }

    let props = source.properties();
    if regions.default_if_empty(props.width, props.height) {
        info!("No regions configured, scanning the full {}x{} frame", props.width, props.height);
    }

    // Initialize the recognition engine
    let mut engine = vision::create_recognizer(&config.ocr.engine, config.ocr.tessdata.as_deref())?;
    info!("Languages: {:?}", config.ocr.languages);
    engine
        .configure(&config.ocr.languages)
        .context("Error configuring recognition engine")?;
    engine
        .warm_up()
        .with_context(|| format!("Recognition engine {} is not usable", engine.name()))?;

    let state = Arc::new(PipelineState::new());
    state.set_stats_hidden(config.general.stats_hidden);

    let display = if config.ui.window {
        open_window(settings.bindings.quit)?
    } else {
        headless_display(config, settings.bindings.quit)
    };

    let coordinator = PipelineCoordinator::start(
        &settings,
        source,
        display,
        engine,
        regions,
        state,
        Arc::new(ConsoleSink::stdout()),
    )?;
    coordinator.run()?;

    Ok(())
}

fn headless_display(config: &AppConfig, quit: Key) -> Box<dyn DisplaySurface> {
    let mut display = HeadlessDisplay::new(quit).with_max_frames(config.capture.max_frames);
    if let Some(path) = &config.ui.snapshot_path {
        display = display.with_snapshot(path.clone(), config.ui.snapshot_every);
    }
    if config.ui.console_input {
        display = display.with_input(overlay::console::spawn_console_input());
        info!("Reading commands from stdin (key names, or region x,y,w,h)");
    }
    Box::new(display)
}

#[cfg(feature = "backend-opencv")]
fn open_window(quit: Key) -> Result<Box<dyn DisplaySurface>> {
    Ok(Box::new(overlay::window::WindowDisplay::open("video-ocr", quit)?))
}

#[cfg(not(feature = "backend-opencv"))]
fn open_window(_quit: Key) -> Result<Box<dyn DisplaySurface>> {
    anyhow::bail!("Window display needs the backend-opencv feature; run with --headless")
}
