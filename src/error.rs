//! Error types for the verivoice detection pipeline.
//!
//! Every failure mode of the core is represented here and caught at the
//! pipeline boundary, where it becomes an ERROR verdict instead of a fault.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all verivoice operations.
#[derive(Error, Debug)]
pub enum VoiceError {
    /// Audio decoding or waveform conversion errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Feature extraction errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Classifier model errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Waveform loader errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to decode audio container: {reason}")]
    DecodeFailed { reason: String },

    #[error("Recognized but unsupported codec: {reason}")]
    UnsupportedFormat { reason: String },

    #[error("No audio track found in container")]
    NoAudioTrack,

    #[error("Audio stream carries no metadata for {field}")]
    MissingMetadata { field: &'static str },

    #[error("Decoded audio contains no samples")]
    EmptyAudio,

    #[error("Invalid sample rate: {rate} Hz (must be 8kHz-192kHz)")]
    InvalidSampleRate { rate: u32 },
}

/// Feature extraction errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Waveform is empty")]
    Empty,

    #[error("Waveform too short for analysis: needed {needed} samples, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("FFT processing failed: {reason}")]
    FftError { reason: String },
}

/// Classifier model errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to load model artifact '{path}': {source}")]
    LoadFailed {
        path: Box<PathBuf>,
        source: std::io::Error,
    },

    #[error("Invalid model artifact format in '{path}': {source}")]
    InvalidFormat {
        path: Box<PathBuf>,
        source: serde_json::Error,
    },

    #[error("Unsupported model artifact version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Model artifact defines no label mapping")]
    MissingLabels,

    #[error("Feature vector length mismatch: model expects {expected}, got {actual}")]
    Mismatch { expected: usize, actual: usize },

    #[error("Wrong feature profile for this strategy: expected {expected}, got {actual}")]
    WrongProfile {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Model produced no class probabilities")]
    EmptyPrediction,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file '{path}': {source}")]
    LoadFailed {
        path: Box<PathBuf>,
        source: std::io::Error,
    },

    #[error("Invalid config format in '{path}': {source}")]
    InvalidFormat {
        path: Box<PathBuf>,
        source: Box<toml::de::Error>,
    },

    #[error("Config validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Failed to save config to '{path}': {source}")]
    SaveFailed {
        path: Box<PathBuf>,
        source: std::io::Error,
    },
}

/// Result type alias for verivoice operations
pub type Result<T, E = VoiceError> = std::result::Result<T, E>;

impl AudioError {
    /// Check if error indicates bad input rather than an internal fault
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AudioError::DecodeFailed { .. }
                | AudioError::UnsupportedFormat { .. }
                | AudioError::NoAudioTrack
                | AudioError::EmptyAudio
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AudioError::DecodeFailed { .. } => {
                "Input is not a decodable audio container".to_string()
            }
            AudioError::UnsupportedFormat { .. } => {
                "Audio codec is not supported by this build".to_string()
            }
            AudioError::NoAudioTrack => "Container holds no audio track".to_string(),
            AudioError::MissingMetadata { field } => {
                format!("Audio stream does not declare its {field}")
            }
            AudioError::EmptyAudio => "Audio sample contains no data".to_string(),
            AudioError::InvalidSampleRate { rate } => {
                format!("Audio has unsupported sample rate: {rate} Hz")
            }
        }
    }
}

impl AnalysisError {
    /// Get suggested recovery action
    pub fn recovery_hint(&self) -> Option<&str> {
        match self {
            AnalysisError::Empty | AnalysisError::TooShort { .. } => {
                Some("Provide a longer recording (at least one analysis frame)")
            }
            AnalysisError::FftError { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AudioError::InvalidSampleRate { rate: 999 };
        assert!(err.to_string().contains("999"));
        assert!(err.to_string().contains("8kHz-192kHz"));
    }

    #[test]
    fn test_input_errors() {
        let input = AudioError::DecodeFailed {
            reason: "bad magic".to_string(),
        };
        assert!(input.is_input_error());

        let internal = AudioError::InvalidSampleRate { rate: 999 };
        assert!(!internal.is_input_error());
    }

    #[test]
    fn test_user_messages() {
        let err = AudioError::InvalidSampleRate { rate: 1000 };
        let msg = err.user_message();
        assert!(msg.contains("1000"));
        assert!(!msg.contains("Error")); // User-friendly, not technical
    }

    #[test]
    fn test_recovery_hints() {
        let err = AnalysisError::TooShort {
            needed: 2048,
            actual: 100,
        };
        assert!(err.recovery_hint().is_some());
    }

    #[test]
    fn test_mismatch_display() {
        let err = ModelError::Mismatch {
            expected: 233,
            actual: 5,
        };
        assert!(err.to_string().contains("233"));
        assert!(err.to_string().contains('5'));
    }
}
