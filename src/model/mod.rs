//! Risk model and attribution adapters.
//!
//! The pretrained classifier and its explainer sit behind two narrow
//! traits, `RiskModel` and `Explainer`, so the rest of the application
//! never sees the artifact format. The shipped implementations read a
//! CatBoost JSON export (oblivious trees).

pub mod classifier;
pub mod ensemble;
pub mod explainer;
pub mod tier;

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub use classifier::{CatBoostClassifier, RiskModel};
pub use explainer::{Attribution, Contribution, Direction, Explainer, TreeExplainer};
pub use tier::RiskTier;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("Cannot read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported model artifact: {0}")]
    Invalid(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Read an artifact, logging its size and SHA-256 so operators can tell
/// which file a running instance loaded.
pub(crate) fn read_artifact(path: &std::path::Path) -> Result<Vec<u8>, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let digest = Sha256::digest(&bytes);
    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        sha256 = %format!("{digest:x}"),
        "Model artifact read"
    );
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixed-output adapters for exercising callers without an artifact.

    use super::*;
    use crate::features::{Feature, FeatureVector};

    pub struct FixedRiskModel(pub f64);

    impl RiskModel for FixedRiskModel {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
            Ok(self.0)
        }
    }

    pub struct FailingRiskModel;

    impl RiskModel for FailingRiskModel {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
            Err(ModelError::Inference("model offline".into()))
        }
    }

    /// Attributes each feature its own value times a weight.
    pub struct LinearExplainer {
        pub base: f64,
        pub weight: f64,
    }

    impl Explainer for LinearExplainer {
        fn expected_value(&self) -> f64 {
            self.base
        }

        fn explain(&self, features: &FeatureVector) -> Result<Attribution, ModelError> {
            Ok(Attribution::new(
                self.base,
                Feature::ALL
                    .iter()
                    .map(|f| Contribution::new(*f, features.get(*f) * self.weight))
                    .collect(),
            ))
        }
    }

    /// Two-tree ensemble over Cortisol and RBG used by adapter tests.
    pub const SMALL_MODEL_JSON: &str = r#"{
        "features_info": {
            "float_features": [
                {"feature_index": 0, "feature_id": "Cortisol"},
                {"feature_index": 1, "feature_id": "CRP"},
                {"feature_index": 2, "feature_id": "Duration"},
                {"feature_index": 3, "feature_id": "CysC"},
                {"feature_index": 4, "feature_id": "C-P2"},
                {"feature_index": 5, "feature_id": "BUN"},
                {"feature_index": 6, "feature_id": "APTT"},
                {"feature_index": 7, "feature_id": "RBG"},
                {"feature_index": 8, "feature_id": "FT3"},
                {"feature_index": 9, "feature_id": "ACR"}
            ]
        },
        "oblivious_trees": [
            {
                "splits": [
                    {"float_feature_index": 0, "border": 12.0, "split_type": "FloatFeature"},
                    {"float_feature_index": 7, "border": 7.0, "split_type": "FloatFeature"}
                ],
                "leaf_values": [-1.0, 0.5, 0.25, 1.5],
                "leaf_weights": [40, 20, 30, 10]
            },
            {
                "splits": [
                    {"float_feature_index": 9, "border": 25.0, "split_type": "FloatFeature"}
                ],
                "leaf_values": [-0.2, 0.6],
                "leaf_weights": [70, 30]
            }
        ],
        "scale_and_bias": [1.0, [-0.1]]
    }"#;
}
