//! Configuration management for scanstream.
//!
//! Provides loading, saving, and validation of camera acquisition, frame
//! sampling, and decoder selection settings. The sampling thresholds are
//! empirically tuned defaults, not load-bearing constants.

use crate::errors::ScanError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanstreamConfig {
    pub camera: CameraConfig,
    pub sampler: SamplerConfig,
    pub decoder: DecoderConfig,
}

/// Camera acquisition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Device to acquire; falls back to the preferred-device heuristic
    pub preferred_device: Option<String>,
    /// Resolution requested at the optimal constraint tier [width, height]
    pub optimal_resolution: [u32; 2],
    /// Resolution requested at the basic constraint tier [width, height]
    pub basic_resolution: [u32; 2],
    /// Frames per second requested at constrained tiers
    pub fps: u32,
    /// Bound on time-to-first-frame after stream attachment, in seconds
    pub readiness_timeout_secs: u64,
}

/// Frame sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Sampling timer interval in milliseconds
    pub tick_interval_ms: u64,
    /// Fraction of the frame kept as the centered region of interest (0.0-1.0)
    pub roi_fraction: f32,
    /// Minimum fraction of changed hash cells required to attempt a decode
    pub change_threshold: f32,
    /// Ticks that may be skipped consecutively before a decode is forced
    pub max_consecutive_skips: u32,
}

/// Decoder backend selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Prefer the platform-native detector when the platform advertises one
    pub prefer_native: bool,
    /// Use the backend's continuous mode instead of the frame sampler when
    /// the backend supports it
    pub use_continuous_when_available: bool,
}

impl Default for ScanstreamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                preferred_device: None,
                optimal_resolution: [1920, 1080],
                basic_resolution: [1280, 720],
                fps: 30,
                readiness_timeout_secs: 10,
            },
            sampler: SamplerConfig {
                tick_interval_ms: 300,
                roi_fraction: 0.6,
                change_threshold: 0.05,
                max_consecutive_skips: 10,
            },
            decoder: DecoderConfig {
                prefer_native: true,
                use_continuous_when_available: false,
            },
        }
    }
}

impl ScanstreamConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScanError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: ScanstreamConfig = toml::from_str(&contents)
            .map_err(|e| ScanError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ScanError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ScanError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ScanError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| ScanError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("scanstream.toml")
    }

    /// Load from default location or create with defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.camera.optimal_resolution[0] == 0 || self.camera.optimal_resolution[1] == 0 {
            return Err("Invalid optimal resolution".to_string());
        }
        if self.camera.basic_resolution[0] == 0 || self.camera.basic_resolution[1] == 0 {
            return Err("Invalid basic resolution".to_string());
        }
        if self.camera.fps == 0 || self.camera.fps > 240 {
            return Err("Invalid FPS (must be 1-240)".to_string());
        }
        if self.camera.readiness_timeout_secs == 0 {
            return Err("Readiness timeout must be at least 1 second".to_string());
        }

        if self.sampler.tick_interval_ms < 16 {
            return Err("Sampling interval must be at least 16ms".to_string());
        }
        if !(0.1..=1.0).contains(&self.sampler.roi_fraction) {
            return Err("ROI fraction must be between 0.1 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.sampler.change_threshold) {
            return Err("Change threshold must be between 0.0 and 1.0".to_string());
        }
        if self.sampler.max_consecutive_skips == 0 {
            return Err("Max consecutive skips must be at least 1".to_string());
        }

        Ok(())
    }
}
