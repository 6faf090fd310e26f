//! Detection pipeline orchestrator.
//!
//! Sequences loader, extractor and decision engine for one audio sample:
//!
//! ```text
//! bytes -> Waveform -> features -> Verdict
//! ```
//!
//! Each run is synchronous and independent; the only shared state is the
//! read-only engine resolved at construction. Every stage failure is caught
//! here and becomes an ERROR verdict, so `run` never fails or panics, and
//! processing time is reported even for failed runs.

use crate::audio::{self, RawAudio};
use crate::config::AppConfig;
use crate::engine::{DecisionEngine, ExtractedFeatures, FeatureProfile, Label, Verdict};
use crate::error::VoiceError;
use crate::features::FeatureExtractor;
use serde::Serialize;
use std::time::Instant;

/// Result of one pipeline run, in the shape consumed by callers.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub classification: Label,
    pub confidence: f32,
    pub explanation: String,
    pub processing_time_ms: u64,
}

impl Detection {
    fn from_verdict(verdict: Verdict, processing_time_ms: u64) -> Self {
        Self {
            classification: verdict.label,
            confidence: verdict.confidence,
            explanation: verdict.rationale,
            processing_time_ms,
        }
    }
}

/// One-shot audio classification pipeline.
///
/// Construct once at startup; `run` may then be called from any number of
/// threads, since the pipeline holds no per-run mutable state.
pub struct DetectionPipeline {
    engine: DecisionEngine,
    extractor: FeatureExtractor,
    target_rate: u32,
}

impl DetectionPipeline {
    /// Build the pipeline, resolving the decision strategy once.
    pub fn new(config: &AppConfig) -> Self {
        let engine = DecisionEngine::from_config(config);
        Self::with_engine(config, engine)
    }

    /// Build with an explicit engine. Used by tests and by callers that
    /// manage artifact loading themselves.
    pub fn with_engine(config: &AppConfig, engine: DecisionEngine) -> Self {
        tracing::info!(strategy = engine.strategy_name(), "Pipeline ready");
        Self {
            extractor: FeatureExtractor::new(
                config.pipeline.target_sample_rate,
                config.features.silence_rms_threshold,
            ),
            target_rate: config.pipeline.target_sample_rate,
            engine,
        }
    }

    /// Active decision strategy name.
    pub fn strategy_name(&self) -> &'static str {
        self.engine.strategy_name()
    }

    /// Classify one audio sample. Never fails: stage errors become an
    /// ERROR-labeled detection with the cause in the explanation.
    pub fn run(&self, raw: RawAudio) -> Detection {
        let start = Instant::now();

        let verdict = match self.classify(raw) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::debug!(error = %e, "Pipeline run failed");
                Verdict::error(e.to_string())
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            label = %verdict.label,
            confidence = verdict.confidence,
            elapsed_ms,
            "Pipeline run complete"
        );

        Detection::from_verdict(verdict, elapsed_ms)
    }

    fn classify(&self, raw: RawAudio) -> Result<Verdict, VoiceError> {
        let waveform = audio::load(raw, self.target_rate)?;

        let features = match self.engine.profile() {
            FeatureProfile::Lightweight => {
                ExtractedFeatures::Lightweight(self.extractor.lightweight(&waveform)?)
            }
            FeatureProfile::Comprehensive => {
                ExtractedFeatures::Comprehensive(self.extractor.comprehensive(&waveform)?)
            }
        };

        Ok(self.engine.decide(&features)?)
    }
}
