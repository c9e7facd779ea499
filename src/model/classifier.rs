use std::path::Path;

use super::ensemble::{sigmoid, TreeEnsemble};
use super::ModelError;
use crate::features::FeatureVector;

/// Binary classifier returning the probability of the positive (DR) class.
pub trait RiskModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}

/// Gradient-boosted oblivious trees with a logistic link.
pub struct CatBoostClassifier {
    ensemble: TreeEnsemble,
}

impl CatBoostClassifier {
    pub fn new(ensemble: TreeEnsemble) -> Self {
        Self { ensemble }
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        TreeEnsemble::load(path).map(Self::new)
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }
}

impl RiskModel for CatBoostClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let margin = self.ensemble.raw_margin(features);
        let probability = sigmoid(margin);
        if !probability.is_finite() {
            return Err(ModelError::Inference(format!(
                "non-finite probability from margin {margin}"
            )));
        }
        Ok(probability.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;
    use crate::model::testing::SMALL_MODEL_JSON;

    fn classifier() -> CatBoostClassifier {
        CatBoostClassifier::new(TreeEnsemble::from_json(SMALL_MODEL_JSON.as_bytes()).unwrap())
    }

    #[test]
    fn probability_is_sigmoid_of_margin() {
        let x = FeatureVector::new()
            .with(Feature::Cortisol, 15.2)
            .with(Feature::Rbg, 6.5)
            .with(Feature::Acr, 30.0);
        let p = classifier().predict(&x).unwrap();
        assert!((p - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn all_zero_input_is_low_margin() {
        // -1.0 - 0.2 - 0.1
        let p = classifier().predict(&FeatureVector::new()).unwrap();
        assert!((p - sigmoid(-1.3)).abs() < 1e-12);
        assert!(p < 0.30);
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catboost_model.json");
        std::fs::write(&path, SMALL_MODEL_JSON).unwrap();
        let model = CatBoostClassifier::load(&path).unwrap();
        assert_eq!(model.ensemble().trees().len(), 2);
    }

    #[test]
    fn trait_object_is_usable() {
        let model: std::sync::Arc<dyn RiskModel> = std::sync::Arc::new(classifier());
        let p = model.predict(&FeatureVector::new()).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}
