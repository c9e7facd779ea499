//! Per-feature attribution of a prediction in log-odds space.
//!
//! `TreeExplainer` computes exact Shapley values over each tree's own
//! features using path-dependent (training cover) expectations. The
//! contributions plus `expected_value` reproduce the raw margin.

use std::path::Path;

use serde::Serialize;

use super::ensemble::{ObliviousTree, TreeEnsemble};
use super::ModelError;
use crate::features::{Feature, FeatureVector, FEATURE_COUNT};

pub trait Explainer: Send + Sync {
    /// Baseline log-odds, the margin before any feature is observed.
    fn expected_value(&self) -> f64;

    fn explain(&self, features: &FeatureVector) -> Result<Attribution, ModelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    IncreasesRisk,
    DecreasesRisk,
}

impl Direction {
    /// Bar color: red pushes toward DR, green away from it.
    pub fn color(self) -> &'static str {
        match self {
            Self::IncreasesRisk => "red",
            Self::DecreasesRisk => "green",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    pub feature: Feature,
    pub value: f64,
}

impl Contribution {
    pub fn new(feature: Feature, value: f64) -> Self {
        Self { feature, value }
    }

    /// Zero counts as decreasing.
    pub fn direction(&self) -> Direction {
        if self.value > 0.0 {
            Direction::IncreasesRisk
        } else {
            Direction::DecreasesRisk
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub expected_value: f64,
    /// Canonical feature order.
    pub contributions: Vec<Contribution>,
}

impl Attribution {
    pub fn new(expected_value: f64, contributions: Vec<Contribution>) -> Self {
        Self {
            expected_value,
            contributions,
        }
    }

    /// Largest absolute contribution first; ties keep canonical order.
    pub fn ranked(&self) -> Vec<Contribution> {
        let mut ranked = self.contributions.clone();
        ranked.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
        ranked
    }

    pub fn total(&self) -> f64 {
        self.contributions.iter().map(|c| c.value).sum()
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.contributions
            .iter()
            .find(|c| c.feature == feature)
            .map(|c| c.value)
    }
}

pub struct TreeExplainer {
    ensemble: TreeEnsemble,
    expected_value: f64,
}

impl TreeExplainer {
    pub fn new(ensemble: TreeEnsemble) -> Self {
        let origin = FeatureVector::new();
        let baseline: f64 = ensemble
            .trees()
            .iter()
            .map(|t| t.conditional_expectation(&origin, &vec![false; t.depth()]))
            .sum();
        let expected_value = ensemble.scale() * baseline + ensemble.bias();
        Self {
            ensemble,
            expected_value,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let explainer = TreeEnsemble::load(path).map(Self::new)?;
        tracing::info!(
            expected_value = explainer.expected_value,
            "Attribution model ready"
        );
        Ok(explainer)
    }
}

impl Explainer for TreeExplainer {
    fn expected_value(&self) -> f64 {
        self.expected_value
    }

    fn explain(&self, features: &FeatureVector) -> Result<Attribution, ModelError> {
        let mut phi = [0.0f64; FEATURE_COUNT];
        for tree in self.ensemble.trees() {
            accumulate_tree(tree, features, &mut phi);
        }

        let scale = self.ensemble.scale();
        let contributions = Feature::ALL
            .iter()
            .map(|f| Contribution::new(*f, scale * phi[f.index()]))
            .collect::<Vec<_>>();
        if contributions.iter().any(|c| !c.value.is_finite()) {
            return Err(ModelError::Inference("non-finite attribution".into()));
        }
        Ok(Attribution::new(self.expected_value, contributions))
    }
}

/// Add one tree's Shapley values to `phi`, enumerating every coalition of
/// the distinct features the tree splits on.
fn accumulate_tree(tree: &ObliviousTree, features: &FeatureVector, phi: &mut [f64; FEATURE_COUNT]) {
    let mut players: Vec<Feature> = Vec::new();
    let mut split_player = Vec::with_capacity(tree.depth());
    for split in tree.splits() {
        let slot = match players.iter().position(|p| *p == split.feature) {
            Some(slot) => slot,
            None => {
                players.push(split.feature);
                players.len() - 1
            }
        };
        split_player.push(slot);
    }

    let k = players.len();
    if k == 0 {
        return;
    }

    let coalitions = 1usize << k;
    let mut known = vec![false; tree.depth()];
    let values: Vec<f64> = (0..coalitions)
        .map(|mask| {
            for (d, slot) in split_player.iter().enumerate() {
                known[d] = mask & (1usize << *slot) != 0;
            }
            tree.conditional_expectation(features, &known)
        })
        .collect();

    let weights = shapley_weights(k);
    for (slot, player) in players.iter().enumerate() {
        let bit = 1usize << slot;
        let share: f64 = (0..coalitions)
            .filter(|mask| mask & bit == 0)
            .map(|mask| weights[mask.count_ones() as usize] * (values[mask | bit] - values[mask]))
            .sum();
        phi[player.index()] += share;
    }
}

/// `w[s] = s! (k - s - 1)! / k!` for coalitions of size `s`.
fn shapley_weights(k: usize) -> Vec<f64> {
    let factorial = |n: usize| (1..=n).map(|i| i as f64).product::<f64>();
    let total = factorial(k);
    (0..k)
        .map(|s| factorial(s) * factorial(k - s - 1) / total)
        .collect()
}
