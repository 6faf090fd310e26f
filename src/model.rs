//! Trained classifier artifact.
//!
//! The artifact is a versioned JSON document describing a decision forest:
//! split nodes over comprehensive-profile feature indices, leaves carrying
//! class-probability distributions, and an explicit label mapping. The label
//! order and the expected feature length are part of the artifact, never
//! inferred, so a model trained on one feature layout refuses any other.
//!
//! Loaded once at startup and shared read-only afterwards; inference never
//! mutates the model.

use crate::error::ModelError;
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Artifact schema version this build understands.
pub const SUPPORTED_VERSION: u32 = 1;

/// One node of a decision tree. Children are indices into the tree's node
/// array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        probabilities: Vec<f32>,
    },
}

/// A single decision tree, nodes in array form with the root at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk the tree for one feature vector; returns the leaf distribution.
    ///
    /// The walk is bounded by the node count, so a malformed tree with a
    /// cycle terminates instead of looping.
    fn predict(&self, features: &[f32]) -> Option<&[f32]> {
        let mut index = 0usize;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index)? {
                TreeNode::Leaf { probabilities } => return Some(probabilities),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features.get(*feature)? <= threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
        None
    }
}

/// Immutable classifier model mapping a [`FeatureVector`] to a label index
/// and class-probability distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub version: u32,
    pub feature_len: usize,
    /// Class labels in probability-index order, e.g.
    /// `["HUMAN_GENERATED", "AI_GENERATED"]`.
    pub labels: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl ClassifierModel {
    /// Load and validate an artifact from disk. Called once at startup.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|source| ModelError::LoadFailed {
            path: Box::new(path.to_path_buf()),
            source,
        })?;

        let model: Self =
            serde_json::from_str(&contents).map_err(|source| ModelError::InvalidFormat {
                path: Box::new(path.to_path_buf()),
                source,
            })?;

        model.validate()?;

        tracing::info!(
            path = %path.display(),
            version = model.version,
            feature_len = model.feature_len,
            trees = model.trees.len(),
            "Loaded classifier model"
        );

        Ok(model)
    }

    /// Structural checks applied right after deserialization.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != SUPPORTED_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: self.version,
                supported: SUPPORTED_VERSION,
            });
        }

        if self.labels.is_empty() {
            return Err(ModelError::MissingLabels);
        }

        if self.trees.is_empty() {
            return Err(ModelError::EmptyPrediction);
        }

        for tree in &self.trees {
            for node in &tree.nodes {
                match node {
                    TreeNode::Leaf { probabilities } if probabilities.len() != self.labels.len() => {
                        return Err(ModelError::Mismatch {
                            expected: self.labels.len(),
                            actual: probabilities.len(),
                        });
                    }
                    TreeNode::Split { feature, .. } if *feature >= self.feature_len => {
                        return Err(ModelError::Mismatch {
                            expected: self.feature_len,
                            actual: *feature + 1,
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Feature vector length this model was trained on.
    pub fn expected_len(&self) -> usize {
        self.feature_len
    }

    /// Label string for a class index, as defined by the artifact.
    pub fn label_for(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Predict the class index and its probability for one feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Mismatch`] when the vector length differs from
    /// the trained length, and [`ModelError::EmptyPrediction`] when no tree
    /// yields a leaf.
    pub fn predict(&self, vector: &FeatureVector) -> Result<(usize, f32), ModelError> {
        if vector.len() != self.feature_len {
            return Err(ModelError::Mismatch {
                expected: self.feature_len,
                actual: vector.len(),
            });
        }

        let mut summed = vec![0.0f32; self.labels.len()];
        let mut voted = 0usize;

        for tree in &self.trees {
            if let Some(probabilities) = tree.predict(vector.as_slice()) {
                for (acc, &p) in summed.iter_mut().zip(probabilities.iter()) {
                    *acc += p;
                }
                voted += 1;
            }
        }

        if voted == 0 {
            return Err(ModelError::EmptyPrediction);
        }

        for p in &mut summed {
            *p /= voted as f32;
        }

        let (best, &confidence) = summed
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or(ModelError::EmptyPrediction)?;

        Ok((best, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::stub_classifier_model as stub_model;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_stub_model_validates() {
        stub_model(5).validate().expect("stub model should be valid");
    }

    #[test]
    fn test_predict_both_classes() {
        let model = stub_model(5);

        let human = FeatureVector::from_raw(vec![0.1, 0.0, 0.0, 0.0, 0.0]);
        let (class, confidence) = model.predict(&human).unwrap();
        assert_eq!(class, 0);
        assert!((confidence - 0.85).abs() < 1e-6);
        assert_eq!(model.label_for(class), Some("HUMAN_GENERATED"));

        let ai = FeatureVector::from_raw(vec![0.9, 0.0, 0.0, 0.0, 0.0]);
        let (class, confidence) = model.predict(&ai).unwrap();
        assert_eq!(class, 1);
        assert!((confidence - 0.85).abs() < 1e-6);
        assert_eq!(model.label_for(class), Some("AI_GENERATED"));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let model = stub_model(5);
        let wrong = FeatureVector::from_raw(vec![0.0; 7]);
        assert!(matches!(
            model.predict(&wrong),
            Err(ModelError::Mismatch {
                expected: 5,
                actual: 7
            })
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut model = stub_model(5);
        model.version = 99;
        assert!(matches!(
            model.validate(),
            Err(ModelError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_split_feature_out_of_range_rejected() {
        let mut model = stub_model(5);
        model.feature_len = 0;
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_load_roundtrip() {
        let model = stub_model(5);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&model).unwrap().as_bytes())
            .unwrap();
        file.flush().unwrap();

        let loaded = ClassifierModel::load(file.path()).unwrap();
        assert_eq!(loaded.feature_len, 5);
        assert_eq!(loaded.labels, model.labels);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ClassifierModel::load("/nonexistent/model.json");
        assert!(matches!(result, Err(ModelError::LoadFailed { .. })));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not json at all").unwrap();
        file.flush().unwrap();

        let result = ClassifierModel::load(file.path());
        assert!(matches!(result, Err(ModelError::InvalidFormat { .. })));
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let model = stub_model(5);
        let v = FeatureVector::from_raw(vec![0.7, 0.1, 0.2, 0.3, 0.4]);
        assert_eq!(model.predict(&v).unwrap(), model.predict(&v).unwrap());
    }
}
