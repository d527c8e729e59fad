//! Configuration management for crabcast
//!
//! Default capture options, publish settings (codecs, simulcast layers, SVC
//! mode) and worker sizing. Loaded from TOML, optionally layered with
//! `CRABCAST__` environment overrides.

use crate::errors::PublishError;
use crate::types::{CaptureOptions, VideoCodec};
use crate::webrtc::simulcast::SimulcastConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CrabcastConfig {
    #[serde(default)]
    pub capture: CaptureOptions,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Publishing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Codec the primary sender starts with
    pub default_codec: VideoCodec,
    /// Alternate codec offered to subscribers that cannot decode the primary
    pub backup_codec: Option<VideoCodec>,
    pub simulcast: SimulcastConfig,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            default_codec: VideoCodec::Vp8,
            backup_codec: None,
            simulcast: SimulcastConfig::default(),
        }
    }
}

/// Track worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Commands queued per track before callers wait
    pub command_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command_capacity: 32,
        }
    }
}

impl CrabcastConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PublishError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| PublishError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CrabcastConfig = toml::from_str(&contents)
            .map_err(|e| PublishError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load `path` (optional) with `CRABCAST__SECTION__KEY` environment
    /// overrides on top of the defaults.
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, PublishError> {
        let path = path.as_ref();
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| PublishError::Config(format!("Failed to seed defaults: {}", e)))?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("CRABCAST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| PublishError::Config(format!("Failed to layer config: {}", e)))?;

        let config: CrabcastConfig = settings
            .try_deserialize()
            .map_err(|e| PublishError::Config(format!("Failed to parse layered config: {}", e)))?;

        log::debug!("Layered configuration from {:?} and environment", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PublishError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PublishError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| PublishError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| PublishError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabcast.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let params = &self.capture.capture_params;
        if params.width == 0 || params.height == 0 {
            return Err("Invalid capture resolution".to_string());
        }
        if params.max_fps == 0 || params.max_fps > 240 {
            return Err("Invalid capture FPS (must be 1-240)".to_string());
        }

        let simulcast = &self.publish.simulcast;
        if simulcast.enabled && simulcast.layers.is_empty() {
            return Err("Simulcast enabled without layers".to_string());
        }
        for layer in &simulcast.layers {
            if !matches!(layer.rid.as_str(), "q" | "h" | "f") {
                return Err(format!("Unknown simulcast rid '{}'", layer.rid));
            }
            if layer.width == 0 || layer.height == 0 || layer.fps == 0 {
                return Err(format!("Invalid simulcast layer '{}'", layer.rid));
            }
        }
        if let Some(mode) = &simulcast.scalability_mode {
            if mode.is_empty() {
                return Err("Scalability mode must not be empty".to_string());
            }
        }

        if self.publish.backup_codec == Some(self.publish.default_codec) {
            return Err("Backup codec must differ from the default codec".to_string());
        }

        if self.worker.command_capacity == 0 {
            return Err("Worker command capacity must be at least 1".to_string());
        }

        Ok(())
    }
}
