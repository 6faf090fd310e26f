//! Application configuration with TOML persistence.
//!
//! Supports loading from file with fallback to defaults. The default values
//! are the canonical, versioned threshold set; the config layer exists so
//! deployments can pin alternatives explicitly rather than patching code.

use crate::audio::CANONICAL_SAMPLE_RATE;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Pipeline configuration
    pub pipeline: PipelineConfig,

    /// Feature extraction configuration
    pub features: FeaturesConfig,

    /// Heuristic decision thresholds
    pub heuristic: HeuristicConfig,

    /// Classifier model configuration
    pub model: ModelConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Canonical sample rate all waveforms are resampled to (Hz)
    pub target_sample_rate: u32,
}

/// Feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Frame-level RMS below this value counts as silence (0.0-1.0)
    pub silence_rms_threshold: f32,
}

/// Heuristic decision thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Utterances shorter than this are judged synthetic (seconds)
    pub min_natural_duration_secs: f32,

    /// Pitch variance below this suggests a synthetic voice
    pub pitch_variance_threshold: f32,

    /// Silence ratio below this suggests uniform, synthetic energy (0.0-1.0)
    pub silence_ratio_threshold: f32,

    /// Degraded-mode silence-ratio decision boundary (0.0-1.0)
    pub degraded_silence_threshold: f32,
}

/// Classifier model configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelConfig {
    /// Path to the model artifact; absent selects the heuristic strategy
    pub path: Option<PathBuf>,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics collection
    pub enabled: bool,

    /// Histogram precision (significant value digits)
    pub histogram_precision: u8,

    /// Maximum histogram value in milliseconds
    pub histogram_max_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: CANONICAL_SAMPLE_RATE,
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            silence_rms_threshold: 0.01,
        }
    }
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            min_natural_duration_secs: 1.0,
            pitch_variance_threshold: 50.0,
            silence_ratio_threshold: 0.1,
            degraded_silence_threshold: 0.05,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_precision: 2,
            histogram_max_ms: 60_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::LoadFailed {
            path: Box::new(path.to_path_buf()),
            source,
        })?;

        let config: Self =
            toml::from_str(&contents).map_err(|source| ConfigError::InvalidFormat {
                path: Box::new(path.to_path_buf()),
                source: Box::new(source),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::SaveFailed {
                path: Box::new(path.to_path_buf()),
                source,
            })?;
        }

        let contents =
            toml::to_string_pretty(self).expect("Config serialization should never fail");

        std::fs::write(path, contents).map_err(|source| ConfigError::SaveFailed {
            path: Box::new(path.to_path_buf()),
            source,
        })
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("verivoice");

        config_dir.join("config.toml")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(8_000..=192_000).contains(&self.pipeline.target_sample_rate) {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "Target sample rate {} Hz out of range 8kHz-192kHz",
                    self.pipeline.target_sample_rate
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.features.silence_rms_threshold) {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "Silence RMS threshold {} out of range 0.0-1.0",
                    self.features.silence_rms_threshold
                ),
            });
        }

        if self.heuristic.min_natural_duration_secs <= 0.0 {
            return Err(ConfigError::ValidationFailed {
                reason: "Minimum natural duration must be > 0".to_string(),
            });
        }

        for (name, value) in [
            (
                "silence_ratio_threshold",
                self.heuristic.silence_ratio_threshold,
            ),
            (
                "degraded_silence_threshold",
                self.heuristic.degraded_silence_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("{name} {value} out of range 0.0-1.0"),
                });
            }
        }

        if self.heuristic.pitch_variance_threshold < 0.0 {
            return Err(ConfigError::ValidationFailed {
                reason: "Pitch variance threshold must be >= 0".to_string(),
            });
        }

        if !(1..=5).contains(&self.metrics.histogram_precision) {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "Histogram precision {} out of range 1-5",
                    self.metrics.histogram_precision
                ),
            });
        }

        if self.metrics.histogram_max_ms < 2 {
            return Err(ConfigError::ValidationFailed {
                reason: "Histogram max must be at least 2 ms".to_string(),
            });
        }

        Ok(())
    }
}

// Helper for getting config dir
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }

        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }

        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            None
        }
    }
}
