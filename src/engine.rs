//! Decision engine: maps extracted features to a labeled verdict.
//!
//! One engine is resolved at startup and never changes afterwards:
//!
//! * `Trained`: a classifier artifact was loaded; comprehensive features go
//!   through the model and the class probability becomes the confidence.
//! * `Heuristic`: no artifact configured; a fixed decision tree over the
//!   lightweight features with deliberately modest confidences.
//! * `Degraded`: an artifact was configured but failed to load; a coarse
//!   energy-only rule at confidence 0.51 signals low trust. The failed load
//!   is logged once at startup so operators can detect degraded accuracy.

use crate::config::{AppConfig, HeuristicConfig};
use crate::error::ModelError;
use crate::features::{FeatureVector, LightweightFeatures};
use crate::model::ClassifierModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Confidence reported in degraded mode, barely above the decision boundary.
const DEGRADED_CONFIDENCE: f32 = 0.51;

/// Classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    AiGenerated,
    HumanGenerated,
    Error,
}

impl Label {
    /// Parse a label string as defined by a classifier artifact.
    fn from_artifact(s: &str) -> Option<Self> {
        match s {
            "AI_GENERATED" => Some(Label::AiGenerated),
            "HUMAN_GENERATED" => Some(Label::HumanGenerated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::AiGenerated => "AI_GENERATED",
            Label::HumanGenerated => "HUMAN_GENERATED",
            Label::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable classification verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub label: Label,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// Human-readable rationale for the decision.
    pub rationale: String,
}

impl Verdict {
    pub fn new(label: Label, confidence: f32, rationale: impl Into<String>) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
        }
    }

    /// Error-shaped verdict carrying the underlying cause.
    pub fn error(rationale: impl Into<String>) -> Self {
        Self::new(Label::Error, 0.0, rationale)
    }
}

/// Which feature profile an engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureProfile {
    Lightweight,
    Comprehensive,
}

/// Features handed to [`DecisionEngine::decide`], matching its profile.
#[derive(Debug, Clone)]
pub enum ExtractedFeatures {
    Lightweight(LightweightFeatures),
    Comprehensive(FeatureVector),
}

/// Decision strategy resolved once at startup.
pub enum DecisionEngine {
    Trained(Arc<ClassifierModel>),
    Heuristic(HeuristicConfig),
    Degraded(HeuristicConfig),
}

impl DecisionEngine {
    /// Resolve the strategy from configuration.
    ///
    /// A missing model path selects the heuristic; a configured path that
    /// fails to load selects degraded mode and warns once.
    pub fn from_config(config: &AppConfig) -> Self {
        match &config.model.path {
            None => {
                tracing::info!("No classifier model configured, using heuristic strategy");
                DecisionEngine::Heuristic(config.heuristic.clone())
            }
            Some(path) => match ClassifierModel::load(path) {
                Ok(model) => DecisionEngine::Trained(Arc::new(model)),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Classifier model failed to load, running degraded"
                    );
                    DecisionEngine::Degraded(config.heuristic.clone())
                }
            },
        }
    }

    /// Strategy name for logging and summaries.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            DecisionEngine::Trained(_) => "trained",
            DecisionEngine::Heuristic(_) => "heuristic",
            DecisionEngine::Degraded(_) => "degraded",
        }
    }

    /// Feature profile this engine consumes.
    pub fn profile(&self) -> FeatureProfile {
        match self {
            DecisionEngine::Trained(_) => FeatureProfile::Comprehensive,
            DecisionEngine::Heuristic(_) | DecisionEngine::Degraded(_) => {
                FeatureProfile::Lightweight
            }
        }
    }

    /// Produce a verdict from features matching [`Self::profile`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Mismatch`] for a wrong-length vector and
    /// [`ModelError::WrongProfile`] when the caller hands features from the
    /// other profile.
    pub fn decide(&self, features: &ExtractedFeatures) -> Result<Verdict, ModelError> {
        match (self, features) {
            (DecisionEngine::Trained(model), ExtractedFeatures::Comprehensive(vector)) => {
                classify_with_model(model, vector)
            }
            (DecisionEngine::Heuristic(cfg), ExtractedFeatures::Lightweight(light)) => {
                Ok(heuristic_verdict(cfg, light))
            }
            (DecisionEngine::Degraded(cfg), ExtractedFeatures::Lightweight(light)) => {
                Ok(degraded_verdict(cfg, light))
            }
            (DecisionEngine::Trained(_), ExtractedFeatures::Lightweight(_)) => {
                Err(ModelError::WrongProfile {
                    expected: "comprehensive",
                    actual: "lightweight",
                })
            }
            (_, ExtractedFeatures::Comprehensive(_)) => Err(ModelError::WrongProfile {
                expected: "lightweight",
                actual: "comprehensive",
            }),
        }
    }
}

/// Trained strategy: model prediction with the artifact's label mapping.
fn classify_with_model(
    model: &ClassifierModel,
    vector: &FeatureVector,
) -> Result<Verdict, ModelError> {
    let (class, confidence) = model.predict(vector)?;

    let label_str = model.label_for(class).ok_or(ModelError::MissingLabels)?;
    let label = Label::from_artifact(label_str).ok_or(ModelError::MissingLabels)?;

    Ok(Verdict::new(
        label,
        confidence,
        format!("classifier v{} assigned {label_str} with probability {confidence:.2}", model.version),
    ))
}

/// Heuristic strategy: fixed decision tree over lightweight features.
fn heuristic_verdict(cfg: &HeuristicConfig, features: &LightweightFeatures) -> Verdict {
    if features.duration_secs < cfg.min_natural_duration_secs {
        return Verdict::new(
            Label::AiGenerated,
            0.85,
            "duration too short for natural speech",
        );
    }

    if features.pitch_variance < cfg.pitch_variance_threshold
        && features.silence_ratio < cfg.silence_ratio_threshold
    {
        return Verdict::new(Label::AiGenerated, 0.78, "low pitch variance, uniform energy");
    }

    Verdict::new(
        Label::HumanGenerated,
        0.90,
        "natural pitch variation and pauses",
    )
}

/// Degraded strategy: coarse energy-only rule at near-boundary confidence.
fn degraded_verdict(cfg: &HeuristicConfig, features: &LightweightFeatures) -> Verdict {
    if features.silence_ratio < cfg.degraded_silence_threshold {
        Verdict::new(
            Label::AiGenerated,
            DEGRADED_CONFIDENCE,
            "uniform energy with no pauses (degraded mode, classifier unavailable)",
        )
    } else {
        Verdict::new(
            Label::HumanGenerated,
            DEGRADED_CONFIDENCE,
            "audible pauses present (degraded mode, classifier unavailable)",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::stub_classifier_model;

    fn light(duration: f32, silence: f32, pitch_var: f32) -> LightweightFeatures {
        LightweightFeatures {
            duration_secs: duration,
            silence_ratio: silence,
            spectral_centroid_hz: 1500.0,
            spectral_bandwidth_hz: 1200.0,
            pitch_variance: pitch_var,
        }
    }

    fn heuristic_engine() -> DecisionEngine {
        DecisionEngine::Heuristic(HeuristicConfig::default())
    }

    fn degraded_engine() -> DecisionEngine {
        DecisionEngine::Degraded(HeuristicConfig::default())
    }

    #[test]
    fn test_label_serialization() {
        assert_eq!(
            serde_json::to_string(&Label::AiGenerated).unwrap(),
            "\"AI_GENERATED\""
        );
        assert_eq!(
            serde_json::to_string(&Label::HumanGenerated).unwrap(),
            "\"HUMAN_GENERATED\""
        );
        assert_eq!(serde_json::to_string(&Label::Error).unwrap(), "\"ERROR\"");
    }

    #[test]
    fn test_heuristic_short_duration_boundary() {
        let engine = heuristic_engine();
        let verdict = engine
            .decide(&ExtractedFeatures::Lightweight(light(0.99, 0.5, 200.0)))
            .unwrap();
        assert_eq!(verdict.label, Label::AiGenerated);
        assert_eq!(verdict.confidence, 0.85);
    }

    #[test]
    fn test_heuristic_natural_speech_boundary() {
        let engine = heuristic_engine();
        let verdict = engine
            .decide(&ExtractedFeatures::Lightweight(light(1.01, 0.5, 200.0)))
            .unwrap();
        assert_eq!(verdict.label, Label::HumanGenerated);
        assert_eq!(verdict.confidence, 0.90);
    }

    #[test]
    fn test_heuristic_monotone_voice() {
        let engine = heuristic_engine();
        let verdict = engine
            .decide(&ExtractedFeatures::Lightweight(light(2.0, 0.05, 10.0)))
            .unwrap();
        assert_eq!(verdict.label, Label::AiGenerated);
        assert_eq!(verdict.confidence, 0.78);
    }

    #[test]
    fn test_degraded_boundaries() {
        let engine = degraded_engine();

        let ai = engine
            .decide(&ExtractedFeatures::Lightweight(light(2.0, 0.03, 200.0)))
            .unwrap();
        assert_eq!(ai.label, Label::AiGenerated);
        assert!((ai.confidence - 0.51).abs() < 1e-6);

        let human = engine
            .decide(&ExtractedFeatures::Lightweight(light(2.0, 0.2, 200.0)))
            .unwrap();
        assert_eq!(human.label, Label::HumanGenerated);
        assert!((human.confidence - 0.51).abs() < 1e-6);
    }

    #[test]
    fn test_trained_engine_uses_artifact_labels() {
        let engine = DecisionEngine::Trained(Arc::new(stub_classifier_model(5)));

        let verdict = engine
            .decide(&ExtractedFeatures::Comprehensive(FeatureVector::from_raw(
                vec![0.9, 0.0, 0.0, 0.0, 0.0],
            )))
            .unwrap();
        assert_eq!(verdict.label, Label::AiGenerated);
        assert!(verdict.confidence > 0.5);
        assert!(verdict.rationale.contains("classifier"));
    }

    #[test]
    fn test_trained_engine_rejects_wrong_length() {
        let engine = DecisionEngine::Trained(Arc::new(stub_classifier_model(5)));
        let result = engine.decide(&ExtractedFeatures::Comprehensive(FeatureVector::from_raw(
            vec![0.0; 3],
        )));
        assert!(matches!(result, Err(ModelError::Mismatch { .. })));
    }

    #[test]
    fn test_profile_selection() {
        assert_eq!(heuristic_engine().profile(), FeatureProfile::Lightweight);
        assert_eq!(degraded_engine().profile(), FeatureProfile::Lightweight);
        assert_eq!(
            DecisionEngine::Trained(Arc::new(stub_classifier_model(5))).profile(),
            FeatureProfile::Comprehensive
        );
    }

    #[test]
    fn test_mismatched_profile_is_rejected() {
        let engine = heuristic_engine();
        let result = engine.decide(&ExtractedFeatures::Comprehensive(FeatureVector::from_raw(
            vec![0.0; 233],
        )));
        assert!(matches!(
            result,
            Err(ModelError::WrongProfile {
                expected: "lightweight",
                actual: "comprehensive"
            })
        ));

        let result = DecisionEngine::Trained(Arc::new(stub_classifier_model(5)))
            .decide(&ExtractedFeatures::Lightweight(light(2.0, 0.5, 200.0)));
        assert!(matches!(
            result,
            Err(ModelError::WrongProfile {
                expected: "comprehensive",
                actual: "lightweight"
            })
        ));
    }

    #[test]
    fn test_profile_mismatch_names_both_profiles() {
        let err = heuristic_engine()
            .decide(&ExtractedFeatures::Comprehensive(FeatureVector::from_raw(
                vec![0.0; 233],
            )))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("lightweight"));
        assert!(msg.contains("comprehensive"));
        assert!(!msg.contains('0'));
    }

    #[test]
    fn test_from_config_without_model_is_heuristic() {
        let engine = DecisionEngine::from_config(&AppConfig::default());
        assert_eq!(engine.strategy_name(), "heuristic");
    }

    #[test]
    fn test_from_config_with_missing_model_is_degraded() {
        let mut config = AppConfig::default();
        config.model.path = Some("/nonexistent/model.json".into());
        let engine = DecisionEngine::from_config(&config);
        assert_eq!(engine.strategy_name(), "degraded");
    }

    #[test]
    fn test_verdict_confidence_clamped() {
        let v = Verdict::new(Label::AiGenerated, 1.7, "x");
        assert_eq!(v.confidence, 1.0);
    }
}
