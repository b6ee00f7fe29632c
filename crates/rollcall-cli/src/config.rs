//! Runtime configuration.
//!
//! Three layers, each overriding the previous: built-in defaults, an
//! optional TOML config file, then `ROLLCALL_*` environment variables.

use anyhow::{Context, Result};
use rollcall_core::MatchPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// --- Named constants (no magic numbers) ---
const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const MODEL_FILE_NAME: &str = "seeta_fd_frontal_v1.0.bin";
/// Detection runs on a raster downscaled by this factor.
const DEFAULT_DETECT_DOWNSCALE: u32 = 2;
/// Pixels added on every side of a detection before region extraction.
const DEFAULT_REGION_PADDING: u32 = 20;

/// Resolved configuration for all subcommands.
#[derive(Debug, Clone)]
pub struct Config {
    /// V4L2 device path.
    pub camera_device: String,
    /// Directory of labeled gallery images (file stem = identity).
    pub gallery_dir: PathBuf,
    /// Attendance ledger file.
    pub ledger_path: PathBuf,
    /// SeetaFace detection model file.
    pub model_path: PathBuf,
    /// Minimum correlation for a positive match.
    pub match_threshold: f32,
    /// Minimum best-to-second-best gap before a match is accepted.
    pub match_margin: f32,
    /// Integer downscale factor for frame-level detection.
    pub detect_downscale: u32,
    /// Padding around each detection box, in full-resolution pixels.
    pub region_padding: u32,
}

/// On-disk layer: every field optional, unset fields keep their defaults.
#[derive(Debug, Deserialize)]
struct FileConfig {
    camera_device: Option<String>,
    gallery_dir: Option<PathBuf>,
    ledger_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    match_threshold: Option<f32>,
    match_margin: Option<f32>,
    detect_downscale: Option<u32>,
    region_padding: Option<u32>,
}

impl Config {
    /// Resolve configuration for this invocation.
    ///
    /// An explicitly passed config file must exist; the default location
    /// (`$XDG_CONFIG_HOME/rollcall/config.toml`) is used only when present.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::defaults();

        match explicit_file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config file {}", path.display()))?;
                config.apply_file(&text, path)?;
            }
            None => {
                let path = default_config_path();
                if let Ok(text) = std::fs::read_to_string(&path) {
                    config.apply_file(&text, &path)?;
                }
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn defaults() -> Self {
        let data_dir = default_data_dir();
        let policy = MatchPolicy::default();

        Self {
            camera_device: DEFAULT_CAMERA_DEVICE.to_string(),
            gallery_dir: data_dir.join("gallery"),
            ledger_path: data_dir.join("attendance.csv"),
            model_path: data_dir.join("models").join(MODEL_FILE_NAME),
            match_threshold: policy.threshold,
            match_margin: policy.margin,
            detect_downscale: DEFAULT_DETECT_DOWNSCALE,
            region_padding: DEFAULT_REGION_PADDING,
        }
    }

    fn apply_file(&mut self, text: &str, path: &Path) -> Result<()> {
        let file: FileConfig = toml::from_str(text)
            .with_context(|| format!("bad config file {}", path.display()))?;

        if let Some(v) = file.camera_device {
            self.camera_device = v;
        }
        if let Some(v) = file.gallery_dir {
            self.gallery_dir = v;
        }
        if let Some(v) = file.ledger_path {
            self.ledger_path = v;
        }
        if let Some(v) = file.model_path {
            self.model_path = v;
        }
        if let Some(v) = file.match_threshold {
            self.match_threshold = v;
        }
        if let Some(v) = file.match_margin {
            self.match_margin = v;
        }
        if let Some(v) = file.detect_downscale {
            self.detect_downscale = v.max(1);
        }
        if let Some(v) = file.region_padding {
            self.region_padding = v;
        }

        tracing::debug!(path = %path.display(), "applied config file");
        Ok(())
    }

    /// `ROLLCALL_*` environment variables override everything else.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ROLLCALL_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        if let Ok(v) = std::env::var("ROLLCALL_GALLERY_DIR") {
            self.gallery_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ROLLCALL_LEDGER_PATH") {
            self.ledger_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ROLLCALL_MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        self.match_threshold = env_f32("ROLLCALL_MATCH_THRESHOLD", self.match_threshold);
        self.match_margin = env_f32("ROLLCALL_MATCH_MARGIN", self.match_margin);
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy {
            threshold: self.match_threshold,
            margin: self.match_margin,
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
}

fn default_config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("rollcall/config.toml")
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
