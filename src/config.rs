use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::faces::SortMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub scenes: SceneConfig,

    #[serde(default)]
    pub faces: FaceConfig,

    #[serde(default)]
    pub sorting: SortConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Values rejected by [`Config::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("scene threshold must be positive, got {0}")]
    SceneThreshold(f64),
    #[error("face uniqueness threshold must be positive, got {0}")]
    UniquenessThreshold(f64),
    #[error("export fps must be positive, got {0}")]
    Fps(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Difference value at which a frame becomes a cut candidate.
    #[serde(default = "default_scene_threshold")]
    pub threshold: f64,

    /// Frames a scene needs before the next cut is accepted.
    #[serde(default = "default_min_scene_length")]
    pub min_scene_length: u32,
}

fn default_scene_threshold() -> f64 {
    20.0
}

fn default_min_scene_length() -> u32 {
    10
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            threshold: default_scene_threshold(),
            min_scene_length: default_min_scene_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceConfig {
    /// Descriptor distance below which two faces are the same person.
    #[serde(default = "default_uniqueness_threshold")]
    pub uniqueness_threshold: f64,
}

fn default_uniqueness_threshold() -> f64 {
    0.6
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            uniqueness_threshold: default_uniqueness_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SortConfig {
    #[serde(default)]
    pub method: SortMethod,

    #[serde(default)]
    pub reverse: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Frame rate used for EDL timecodes
    #[serde(default = "default_fps")]
    pub fps: f64,
}

fn default_fps() -> f64 {
    25.0
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("frameprint")
        .join("frames.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            scenes: SceneConfig::default(),
            faces: FaceConfig::default(),
            sorting: SortConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default location, writing the defaults there on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "Wrote default config");
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.scenes.threshold) {
            return Err(ConfigError::SceneThreshold(self.scenes.threshold));
        }
        if !is_positive(self.faces.uniqueness_threshold) {
            return Err(ConfigError::UniquenessThreshold(self.faces.uniqueness_threshold));
        }
        if !is_positive(self.export.fps) {
            return Err(ConfigError::Fps(self.export.fps));
        }
        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("frameprint")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// False for zero, negatives and NaN.
fn is_positive(value: f64) -> bool {
    value > 0.0
}
