// Library interface for the voice authenticity classifier components

pub mod audio;
pub mod batch;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod pipeline;

// Test fixtures for synthetic audio generation
pub mod test_fixtures;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::{DecisionEngine, Label, Verdict};
pub use error::{AudioError, ModelError, Result, VoiceError};
pub use pipeline::{Detection, DetectionPipeline};
