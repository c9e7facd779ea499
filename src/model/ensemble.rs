//! Oblivious-tree ensemble parsed from a CatBoost JSON export.
//!
//! Every level of an oblivious tree applies the same split, so a sample's
//! leaf is the bit pattern of its split outcomes: bit `d` is set when the
//! feature value is strictly greater than the border of split `d`.

use std::path::Path;

use serde::Deserialize;

use super::{read_artifact, ModelError};
use crate::features::{Feature, FeatureVector, FEATURE_COUNT};

/// Deeper trees make attribution enumeration impractical.
pub const MAX_TREE_DEPTH: usize = 16;

// ═══════════════════════════════════════════════════════════
// Artifact layout
// ═══════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct RawModel {
    #[serde(default)]
    features_info: RawFeaturesInfo,
    oblivious_trees: Vec<RawTree>,
    #[serde(default)]
    scale_and_bias: Option<(f64, RawBias)>,
}

#[derive(Deserialize, Default)]
struct RawFeaturesInfo {
    #[serde(default)]
    float_features: Vec<RawFloatFeature>,
}

#[derive(Deserialize)]
struct RawFloatFeature {
    feature_index: usize,
    #[serde(default)]
    feature_id: Option<String>,
}

#[derive(Deserialize)]
struct RawTree {
    splits: Vec<RawSplit>,
    leaf_values: Vec<f64>,
    #[serde(default)]
    leaf_weights: Vec<f64>,
}

#[derive(Deserialize)]
struct RawSplit {
    #[serde(default)]
    float_feature_index: Option<usize>,
    #[serde(default)]
    border: Option<f64>,
    #[serde(default)]
    split_type: Option<String>,
}

/// Older exports write the bias as a scalar, newer ones as a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBias {
    Scalar(f64),
    Vector(Vec<f64>),
}

// ═══════════════════════════════════════════════════════════
// Validated model
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    pub feature: Feature,
    pub border: f64,
}

#[derive(Debug, Clone)]
pub struct ObliviousTree {
    splits: Vec<Split>,
    leaf_values: Vec<f64>,
    /// `covers[d][prefix]`: training weight of leaves whose low `d` bits
    /// equal `prefix`. `covers[depth]` is the leaf weights themselves.
    covers: Vec<Vec<f64>>,
}

impl ObliviousTree {
    pub fn new(
        splits: Vec<Split>,
        leaf_values: Vec<f64>,
        leaf_weights: Vec<f64>,
    ) -> Result<Self, ModelError> {
        let depth = splits.len();
        if depth > MAX_TREE_DEPTH {
            return Err(ModelError::Invalid(format!(
                "tree depth {depth} exceeds {MAX_TREE_DEPTH}"
            )));
        }
        let leaves = 1usize << depth;
        if leaf_values.len() != leaves {
            return Err(ModelError::Invalid(format!(
                "tree of depth {depth} needs {leaves} leaf values, found {}",
                leaf_values.len()
            )));
        }
        let weights = if leaf_weights.is_empty() {
            vec![1.0; leaves]
        } else if leaf_weights.len() == leaves {
            leaf_weights
        } else {
            return Err(ModelError::Invalid(format!(
                "tree of depth {depth} needs {leaves} leaf weights, found {}",
                leaf_weights.len()
            )));
        };

        let mut covers = vec![Vec::new(); depth + 1];
        covers[depth] = weights;
        for d in (0..depth).rev() {
            let below = &covers[d + 1];
            covers[d] = (0..1usize << d)
                .map(|prefix| below[prefix] + below[prefix | (1 << d)])
                .collect();
        }

        Ok(Self {
            splits,
            leaf_values,
            covers,
        })
    }

    pub fn depth(&self) -> usize {
        self.splits.len()
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn leaf_index(&self, features: &FeatureVector) -> usize {
        self.splits
            .iter()
            .enumerate()
            .filter(|(_, s)| features.get(s.feature) > s.border)
            .fold(0, |acc, (d, _)| acc | (1 << d))
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        self.leaf_values[self.leaf_index(features)]
    }

    /// Expected leaf value when only the splits flagged in `known` follow
    /// the sample; every other split is averaged by training cover.
    pub fn conditional_expectation(&self, features: &FeatureVector, known: &[bool]) -> f64 {
        self.descend(features, known, 0, 0)
    }

    fn descend(&self, features: &FeatureVector, known: &[bool], depth: usize, prefix: usize) -> f64 {
        if depth == self.depth() {
            return self.leaf_values[prefix];
        }
        let split = &self.splits[depth];
        let upper = prefix | (1 << depth);
        if known[depth] {
            let next = if features.get(split.feature) > split.border {
                upper
            } else {
                prefix
            };
            return self.descend(features, known, depth + 1, next);
        }

        let w_lower = self.covers[depth + 1][prefix];
        let w_upper = self.covers[depth + 1][upper];
        let total = w_lower + w_upper;
        let (p_lower, p_upper) = if total > 0.0 {
            (w_lower / total, w_upper / total)
        } else {
            (0.5, 0.5)
        };
        p_lower * self.descend(features, known, depth + 1, prefix)
            + p_upper * self.descend(features, known, depth + 1, upper)
    }
}

#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    trees: Vec<ObliviousTree>,
    scale: f64,
    bias: f64,
}

impl TreeEnsemble {
    pub fn new(trees: Vec<ObliviousTree>, scale: f64, bias: f64) -> Result<Self, ModelError> {
        if trees.is_empty() {
            return Err(ModelError::Invalid("ensemble has no trees".into()));
        }
        if !scale.is_finite() || !bias.is_finite() {
            return Err(ModelError::Invalid("scale and bias must be finite".into()));
        }
        Ok(Self { trees, scale, bias })
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = read_artifact(path)?;
        let ensemble = Self::from_json(&bytes)?;
        tracing::info!(
            path = %path.display(),
            trees = ensemble.trees.len(),
            "Tree ensemble loaded"
        );
        Ok(ensemble)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let raw: RawModel = serde_json::from_slice(bytes)?;
        let mapping = feature_mapping(&raw.features_info)?;

        let trees = raw
            .oblivious_trees
            .into_iter()
            .enumerate()
            .map(|(t, tree)| {
                let splits = tree
                    .splits
                    .iter()
                    .map(|s| convert_split(s, &mapping))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ModelError::Invalid(format!("tree {t}: {e}")))?;
                ObliviousTree::new(splits, tree.leaf_values, tree.leaf_weights)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (scale, bias) = match raw.scale_and_bias {
            None => (1.0, 0.0),
            Some((scale, RawBias::Scalar(b))) => (scale, b),
            Some((scale, RawBias::Vector(b))) => match b.as_slice() {
                [] => (scale, 0.0),
                [b] => (scale, *b),
                _ => {
                    return Err(ModelError::Invalid(
                        "multi-dimensional output is not a binary classifier".into(),
                    ))
                }
            },
        };

        Self::new(trees, scale, bias)
    }

    pub fn trees(&self) -> &[ObliviousTree] {
        &self.trees
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Log-odds for the positive class.
    pub fn raw_margin(&self, features: &FeatureVector) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        self.scale * sum + self.bias
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Map the artifact's float feature indices onto the canonical order.
/// Named features are matched by name; unnamed ones by position.
fn feature_mapping(info: &RawFeaturesInfo) -> Result<Vec<Feature>, ModelError> {
    if info.float_features.is_empty() {
        return Ok(Feature::ALL.to_vec());
    }
    if info.float_features.len() != FEATURE_COUNT {
        return Err(ModelError::Invalid(format!(
            "model expects {} float features, this application supplies {FEATURE_COUNT}",
            info.float_features.len()
        )));
    }

    let mut mapping = Feature::ALL.to_vec();
    for raw in &info.float_features {
        if raw.feature_index >= FEATURE_COUNT {
            return Err(ModelError::Invalid(format!(
                "float feature index {} out of range",
                raw.feature_index
            )));
        }
        if let Some(name) = raw.feature_id.as_deref().filter(|n| !n.is_empty()) {
            mapping[raw.feature_index] = Feature::from_name(name)
                .ok_or_else(|| ModelError::Invalid(format!("unknown model feature '{name}'")))?;
        }
    }

    let mut seen = [false; FEATURE_COUNT];
    for feature in &mapping {
        if std::mem::replace(&mut seen[feature.index()], true) {
            return Err(ModelError::Invalid(format!(
                "feature '{feature}' appears more than once"
            )));
        }
    }
    Ok(mapping)
}

fn convert_split(raw: &RawSplit, mapping: &[Feature]) -> Result<Split, String> {
    match raw.split_type.as_deref() {
        None | Some("FloatFeature") => {}
        Some(other) => return Err(format!("unsupported split type '{other}'")),
    }
    let index = raw
        .float_feature_index
        .ok_or_else(|| "split has no float_feature_index".to_string())?;
    let feature = *mapping
        .get(index)
        .ok_or_else(|| format!("split references float feature {index}"))?;
    let border = raw
        .border
        .filter(|b| b.is_finite())
        .ok_or_else(|| "split has no finite border".to_string())?;
    Ok(Split { feature, border })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::SMALL_MODEL_JSON;

    fn sample() -> FeatureVector {
        FeatureVector::new()
            .with(Feature::Cortisol, 15.2)
            .with(Feature::Rbg, 6.5)
            .with(Feature::Acr, 30.0)
    }

    #[test]
    fn parses_small_model() {
        let model = TreeEnsemble::from_json(SMALL_MODEL_JSON.as_bytes()).unwrap();
        assert_eq!(model.trees().len(), 2);
        assert_eq!(model.trees()[0].depth(), 2);
        assert_eq!(model.trees()[0].splits()[1].feature, Feature::Rbg);
        assert_eq!(model.scale(), 1.0);
        assert!((model.bias() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn leaf_index_sets_bit_when_above_border() {
        let model = TreeEnsemble::from_json(SMALL_MODEL_JSON.as_bytes()).unwrap();
        let tree = &model.trees()[0];
        // Cortisol above 12, RBG below 7
        assert_eq!(tree.leaf_index(&sample()), 0b01);
        // Equal to the border stays on the lower side
        let at_border = sample().with(Feature::Cortisol, 12.0);
        assert_eq!(tree.leaf_index(&at_border), 0b00);
        let both = sample().with(Feature::Rbg, 9.0);
        assert_eq!(tree.leaf_index(&both), 0b11);
    }

    #[test]
    fn raw_margin_sums_leaves_with_bias() {
        let model = TreeEnsemble::from_json(SMALL_MODEL_JSON.as_bytes()).unwrap();
        // 0.5 (tree 0, leaf 1) + 0.6 (tree 1, leaf 1) - 0.1
        assert!((model.raw_margin(&sample()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn covers_roll_up_leaf_weights() {
        let model = TreeEnsemble::from_json(SMALL_MODEL_JSON.as_bytes()).unwrap();
        let tree = &model.trees()[0];
        let none = vec![false; 2];
        // (-1*40 + 0.5*20 + 0.25*30 + 1.5*10) / 100
        let expected = (-40.0 + 10.0 + 7.5 + 15.0) / 100.0;
        assert!((tree.conditional_expectation(&sample(), &none) - expected).abs() < 1e-12);
        let all = vec![true; 2];
        assert_eq!(tree.conditional_expectation(&sample(), &all), 0.5);
    }

    #[test]
    fn zero_cover_splits_evenly() {
        let tree = ObliviousTree::new(
            vec![Split {
                feature: Feature::Bun,
                border: 1.0,
            }],
            vec![2.0, 4.0],
            vec![0.0, 0.0],
        )
        .unwrap();
        let x = FeatureVector::new();
        assert_eq!(tree.conditional_expectation(&x, &[false]), 3.0);
    }

    #[test]
    fn missing_weights_are_uniform() {
        let json = r#"{"oblivious_trees":[{"splits":[{"float_feature_index":1,"border":0.5}],"leaf_values":[1.0,3.0]}]}"#;
        let model = TreeEnsemble::from_json(json.as_bytes()).unwrap();
        let x = FeatureVector::new();
        assert_eq!(model.trees()[0].conditional_expectation(&x, &[false]), 2.0);
        assert_eq!(model.trees()[0].splits()[0].feature, Feature::Crp);
    }

    #[test]
    fn scalar_bias_is_accepted() {
        let json = r#"{"oblivious_trees":[{"splits":[],"leaf_values":[0.25]}],"scale_and_bias":[2.0,0.5]}"#;
        let model = TreeEnsemble::from_json(json.as_bytes()).unwrap();
        assert_eq!(model.raw_margin(&FeatureVector::new()), 1.0);
    }

    #[test]
    fn rejects_leaf_count_mismatch() {
        let json = r#"{"oblivious_trees":[{"splits":[{"float_feature_index":0,"border":1.0}],"leaf_values":[1.0]}]}"#;
        let err = TreeEnsemble::from_json(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
    }

    #[test]
    fn rejects_categorical_split() {
        let json = r#"{"oblivious_trees":[{"splits":[{"split_type":"OneHotFeature","cat_feature_index":0,"value":3}],"leaf_values":[1.0,2.0]}]}"#;
        let err = TreeEnsemble::from_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("OneHotFeature"));
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let json = r#"{"features_info":{"float_features":[{"feature_index":0,"feature_id":"Cortisol"}]},
                      "oblivious_trees":[{"splits":[],"leaf_values":[0.0]}]}"#;
        let err = TreeEnsemble::from_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn rejects_unknown_feature_name() {
        let json = SMALL_MODEL_JSON.replace("\"FT3\"", "\"TSH\"");
        let err = TreeEnsemble::from_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("TSH"));
    }

    #[test]
    fn rejects_duplicate_feature_name() {
        let json = SMALL_MODEL_JSON.replace("\"FT3\"", "\"ACR\"");
        assert!(TreeEnsemble::from_json(json.as_bytes()).is_err());
    }

    #[test]
    fn named_features_map_by_name() {
        // Swap the names of indices 0 and 7; splits on index 0 now read RBG.
        let json = SMALL_MODEL_JSON
            .replace("\"Cortisol\"", "\"__tmp\"")
            .replace("\"RBG\"", "\"Cortisol\"")
            .replace("\"__tmp\"", "\"RBG\"");
        let model = TreeEnsemble::from_json(json.as_bytes()).unwrap();
        assert_eq!(model.trees()[0].splits()[0].feature, Feature::Rbg);
        assert_eq!(model.trees()[0].splits()[1].feature, Feature::Cortisol);
    }

    #[test]
    fn rejects_empty_ensemble_and_bad_json() {
        assert!(TreeEnsemble::from_json(br#"{"oblivious_trees":[]}"#).is_err());
        assert!(matches!(
            TreeEnsemble::from_json(b"not json").unwrap_err(),
            ModelError::Parse(_)
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TreeEnsemble::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn sigmoid_is_centered() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }
}
