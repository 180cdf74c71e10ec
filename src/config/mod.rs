//! Application Configuration
//!
//! Settings stored in TOML format, overridden by command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::regions::Region;
use crate::vision;

/// Lower bound of the OCR image scale factor
pub const MIN_OCR_SCALE: f64 = 0.1;
/// Upper bound of the OCR image scale factor
pub const MAX_OCR_SCALE: f64 = 1.0;

/// Configuration errors, all fatal before the pipeline starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid region format: {0} (expected x,y,w,h)")]
    InvalidRegion(String),
    #[error("region must have a positive size, got {width}x{height}")]
    EmptyRegion { width: i64, height: i64 },
    #[error("region origin must be non-negative, got ({x}, {y})")]
    NegativeOrigin { x: i64, y: i64 },
    #[error("region component {0} out of range")]
    RegionOutOfRange(i64),
    #[error("invalid key binding: {0}")]
    InvalidKey(String),
    #[error("no recognition languages configured")]
    NoLanguages,
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Capture settings
    pub capture: CaptureSettings,
    /// Recognition settings
    pub ocr: OcrSettings,
    /// Interactive display settings
    pub ui: UiSettings,
}

/// General application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub verbose: bool,
    /// Start with the periodic stats report hidden
    pub stats_hidden: bool,
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Source identifier: "synthetic", an image file, a directory of images,
    /// a camera index or a video file/device path
    pub source: String,
    /// Restart an image sequence at its end instead of stopping
    pub loop_images: bool,
    /// Requested frame width
    pub width: u32,
    /// Requested frame height
    pub height: u32,
    /// Requested capture FPS
    pub fps: u32,
    /// Delay between frames in milliseconds
    pub frame_delay_ms: u64,
    /// Stop the headless display after this many frames (0 = run until quit)
    pub max_frames: u64,
    /// Log the negotiated capture properties at startup
    pub show_properties: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            source: "synthetic".to_string(),
            loop_images: false,
            width: 1920,
            height: 1080,
            fps: 30,
            frame_delay_ms: 1,
            max_frames: 0,
            show_properties: false,
        }
    }
}

/// What the pipeline does when a single recognition job fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorPolicy {
    /// Log, drop the job's results and keep running
    #[default]
    Isolate,
    /// Stop the pipeline with an error status
    Escalate,
}

/// Recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Recognition languages, in priority order
    pub languages: Vec<String>,
    /// Minimum number of captured frames between dispatches
    pub interval_frames: u32,
    /// Image scale applied to each region before recognition
    pub scale: f64,
    /// Regions in `x,y,w,h` form
    pub regions: Vec<String>,
    /// Recognition engine: "tesseract" or "none"
    pub engine: String,
    /// tessdata directory, the library default when unset
    pub tessdata: Option<PathBuf>,
    /// Failure handling for a single job
    pub on_job_error: JobErrorPolicy,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            languages: vec!["eng".to_string()],
            interval_frames: 8,
            scale: 1.0,
            regions: Vec::new(),
            engine: vision::default_engine().to_string(),
            tessdata: None,
            on_job_error: JobErrorPolicy::Isolate,
        }
    }
}

/// Interactive display settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Key toggling recognition pause
    pub pause_key: String,
    /// Key toggling the stats report
    pub stats_key: String,
    /// Key requesting shutdown
    pub quit_key: String,
    /// Install regions drawn with the mouse into the active list
    pub install_drawn_regions: bool,
    /// Show frames in a desktop window instead of running headless
    pub window: bool,
    /// Accept key and region commands on stdin when headless
    pub console_input: bool,
    /// Where to write the annotated frame snapshot (if any)
    pub snapshot_path: Option<PathBuf>,
    /// Write a snapshot every N displayed frames
    pub snapshot_every: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            pause_key: "P".to_string(),
            stats_key: "S".to_string(),
            quit_key: "Esc".to_string(),
            install_drawn_regions: true,
            window: cfg!(feature = "backend-opencv"),
            console_input: true,
            snapshot_path: None,
            snapshot_every: 30,
        }
    }
}

impl AppConfig {
    /// Clamp and fix up values that would otherwise misbehave at runtime
    pub fn normalize(&mut self) {
        self.ocr.scale = clamp_scale(self.ocr.scale);
        self.ocr.interval_frames = self.ocr.interval_frames.max(1);
        self.ocr.languages.retain(|l| !l.trim().is_empty());
        if self.ui.snapshot_every == 0 {
            self.ui.snapshot_every = 1;
        }
    }

    /// Parse the configured region strings
    pub fn parse_regions(&self) -> Result<Vec<Region>, ConfigError> {
        self.ocr.regions.iter().map(|r| r.parse()).collect()
    }

    /// Validate everything that must be correct before the pipeline starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ocr.languages.is_empty() {
            return Err(ConfigError::NoLanguages);
        }
        self.parse_regions()?;
        Ok(())
    }
}

/// Normalize an OCR scale factor into [0.1, 1.0]
pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        return MAX_OCR_SCALE;
    }
    scale.clamp(MIN_OCR_SCALE, MAX_OCR_SCALE)
}

/// Split a comma-separated language list
pub fn parse_languages(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "videoocr", "video-ocr")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert!(!config.general.verbose);
        assert!(!config.general.stats_hidden);

        assert_eq!(config.capture.source, "synthetic");
        assert_eq!(config.capture.width, 1920);
        assert_eq!(config.capture.height, 1080);
        assert_eq!(config.capture.fps, 30);
        assert_eq!(config.capture.frame_delay_ms, 1);
        assert!(!config.capture.loop_images);

        assert_eq!(config.ocr.languages, vec!["eng".to_string()]);
        assert_eq!(config.ocr.interval_frames, 8);
        assert!((config.ocr.scale - 1.0).abs() < f64::EPSILON);
        assert!(config.ocr.regions.is_empty());
        assert_eq!(config.ocr.on_job_error, JobErrorPolicy::Isolate);
        assert_eq!(config.ocr.engine, vision::default_engine());
        assert!(config.ocr.tessdata.is_none());

        assert_eq!(config.ui.quit_key, "Esc");
        assert!(config.ui.install_drawn_regions);
        assert_eq!(config.ui.window, cfg!(feature = "backend-opencv"));
        assert!(config.ui.console_input);
    }

    #[test]
    fn test_scale_clamp() {
        assert!((clamp_scale(0.02) - 0.1).abs() < f64::EPSILON);
        assert!((clamp_scale(3.0) - 1.0).abs() < f64::EPSILON);
        assert!((clamp_scale(0.5) - 0.5).abs() < f64::EPSILON);
        assert!((clamp_scale(f64::NAN) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize() {
        let mut config = AppConfig::default();
        config.ocr.scale = 0.02;
        config.ocr.interval_frames = 0;
        config.ocr.languages = vec!["eng".into(), " ".into(), "jpn".into()];
        config.normalize();

        assert!((config.ocr.scale - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.ocr.interval_frames, 1);
        assert_eq!(config.ocr.languages, vec!["eng".to_string(), "jpn".to_string()]);
    }

    #[test]
    fn test_parse_languages() {
        assert_eq!(parse_languages("eng, jpn,,"), vec!["eng".to_string(), "jpn".to_string()]);
        assert!(parse_languages("").is_empty());
    }

    #[test]
    fn test_validate_rejects_malformed_region() {
        let mut config = AppConfig::default();
        config.ocr.regions = vec!["10,20,300,150".into(), "1,2,3".into()];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRegion(_))));
    }

    #[test]
    fn test_validate_rejects_no_languages() {
        let mut config = AppConfig::default();
        config.ocr.languages.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoLanguages)));
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.capture.source = "/tmp/frames".to_string();
        config.ocr.regions = vec!["0,0,100,50".to_string()];
        config.ocr.on_job_error = JobErrorPolicy::Escalate;
        config.ocr.engine = "none".to_string();
        config.ocr.tessdata = Some(PathBuf::from("/usr/share/tessdata"));
        config.capture.loop_images = true;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.capture.source, "/tmp/frames");
        assert_eq!(parsed.ocr.regions, vec!["0,0,100,50".to_string()]);
        assert_eq!(parsed.ocr.on_job_error, JobErrorPolicy::Escalate);
        assert_eq!(parsed.ocr.engine, "none");
        assert_eq!(parsed.ocr.tessdata, Some(PathBuf::from("/usr/share/tessdata")));
        assert!(parsed.capture.loop_images);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[ocr]\ninterval_frames = 3\n").unwrap();
        assert_eq!(parsed.ocr.interval_frames, 3);
        assert_eq!(parsed.ocr.languages, vec!["eng".to_string()]);
        assert_eq!(parsed.capture.width, 1920);
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.ocr.languages = vec!["eng".into(), "jpn".into()];

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.ocr.languages, config.ocr.languages);
        assert_eq!(loaded.capture.fps, config.capture.fps);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
