//! One risk assessment: validate, predict, tier, persist, explain.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureVector;
use crate::history::{Gender, HistoryStore, PredictionRecord};
use crate::i18n::{Catalog, Locale, MessageKey};
use crate::model::{Contribution, Explainer, ModelError, RiskModel, RiskTier};

#[derive(Error, Debug)]
pub enum AssessmentError {
    #[error("Patient name is required")]
    MissingName,

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentRequest {
    pub patient_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub features: FeatureVector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A localized status line shown alongside the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub key: &'static str,
    pub message: &'static str,
}

impl Notice {
    fn new(level: NoticeLevel, key: MessageKey, catalog: &Catalog, locale: Locale) -> Self {
        Self {
            level,
            key: key.as_str(),
            message: catalog.text(locale, key),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedContribution {
    #[serde(flatten)]
    pub contribution: Contribution,
    pub direction: crate::model::Direction,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentOutcome {
    pub probability: f64,
    pub tier: RiskTier,
    pub tier_label: &'static str,
    pub tier_color: &'static str,
    pub saved: bool,
    pub record: PredictionRecord,
    pub expected_value: f64,
    /// Largest |contribution| first.
    pub contributions: Vec<RankedContribution>,
    pub notices: Vec<Notice>,
}

/// Run a single assessment. A failed history append is reported as a
/// notice; the prediction is still returned.
pub fn run_assessment(
    request: &AssessmentRequest,
    locale: Locale,
    model: &dyn RiskModel,
    explainer: &dyn Explainer,
    store: &HistoryStore,
    catalog: &Catalog,
) -> Result<AssessmentOutcome, AssessmentError> {
    let patient_name = request.patient_name.trim();
    if patient_name.is_empty() {
        return Err(AssessmentError::MissingName);
    }

    let probability = model.predict(&request.features)?;
    let tier = RiskTier::from_probability(probability);

    let record = PredictionRecord::now(
        patient_name,
        request.gender.label(catalog, locale),
        request.features,
        probability,
    );

    let mut notices = Vec::new();
    let saved = match store.append(&record) {
        Ok(()) => {
            tracing::info!(probability, ?tier, "Prediction recorded");
            notices.push(Notice::new(NoticeLevel::Success, MessageKey::RecordSaved, catalog, locale));
            true
        }
        Err(e) => {
            tracing::error!(error = %e, path = %store.path().display(), "Failed to append prediction");
            notices.push(Notice::new(NoticeLevel::Error, MessageKey::SaveFailed, catalog, locale));
            false
        }
    };

    let attribution = explainer.explain(&request.features)?;
    let contributions = attribution
        .ranked()
        .into_iter()
        .map(|contribution| {
            let direction = contribution.direction();
            RankedContribution {
                contribution,
                direction,
                color: direction.color(),
            }
        })
        .collect();

    Ok(AssessmentOutcome {
        probability,
        tier,
        tier_label: catalog.text(locale, tier.message_key()),
        tier_color: tier.color(),
        saved,
        record,
        expected_value: attribution.expected_value,
        contributions,
        notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;
    use crate::model::testing::{FailingRiskModel, FixedRiskModel, LinearExplainer};

    fn scenario_features() -> FeatureVector {
        FeatureVector::new()
            .with(Feature::Cortisol, 15.2)
            .with(Feature::Crp, 3.5)
            .with(Feature::Duration, 5.0)
            .with(Feature::CysC, 1.2)
            .with(Feature::CP2, 2.8)
            .with(Feature::Bun, 6.5)
            .with(Feature::Aptt, 32.0)
            .with(Feature::Rbg, 7.2)
            .with(Feature::Ft3, 4.5)
            .with(Feature::Acr, 30.0)
    }

    fn request(name: &str) -> AssessmentRequest {
        AssessmentRequest {
            patient_name: name.into(),
            gender: Gender::Male,
            features: scenario_features(),
        }
    }

    fn explainer() -> LinearExplainer {
        LinearExplainer {
            base: -0.5,
            weight: 0.01,
        }
    }

    #[test]
    fn end_to_end_medium_risk_appends_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history/prediction_history.csv"));
        let catalog = Catalog::builtin();

        let outcome = run_assessment(
            &request("Zhang San"),
            Locale::En,
            &FixedRiskModel(0.45),
            &explainer(),
            &store,
            &catalog,
        )
        .unwrap();

        assert_eq!(outcome.tier, RiskTier::Medium);
        assert_eq!(outcome.tier_color, "orange");
        assert_eq!(outcome.tier_label, "Medium Risk");
        assert!(outcome.saved);
        assert_eq!(outcome.notices[0].key, "record_saved");

        let load = store.load_all().unwrap();
        assert_eq!(load.records.len(), 1);
        let row = &load.records[0].record;
        assert_eq!(row.patient_name, "Zhang San");
        assert_eq!(row.gender, "Male");
        assert_eq!(row.features.get(Feature::Acr), 30.0);
        assert_eq!(row.risk_probability, 0.45);
    }

    #[test]
    fn blank_name_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prediction_history.csv");
        let store = HistoryStore::new(&path);
        let catalog = Catalog::builtin();

        let err = run_assessment(
            &request("   "),
            Locale::En,
            &FixedRiskModel(0.45),
            &explainer(),
            &store,
            &catalog,
        )
        .unwrap_err();
        assert!(matches!(err, AssessmentError::MissingName));
        assert!(!path.exists());
    }

    #[test]
    fn save_failure_still_returns_result() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the append fail.
        let path = dir.path().join("prediction_history.csv");
        std::fs::create_dir(&path).unwrap();
        let store = HistoryStore::new(&path);
        let catalog = Catalog::builtin();

        let outcome = run_assessment(
            &request("Li Si"),
            Locale::Zh,
            &FixedRiskModel(0.82),
            &explainer(),
            &store,
            &catalog,
        )
        .unwrap();
        assert!(!outcome.saved);
        assert_eq!(outcome.tier, RiskTier::High);
        assert_eq!(outcome.notices[0].level, NoticeLevel::Error);
        assert_eq!(outcome.notices[0].message, catalog.text(Locale::Zh, MessageKey::SaveFailed));
    }

    #[test]
    fn gender_is_stored_as_localized_label() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("h.csv"));
        let catalog = Catalog::builtin();
        let mut req = request("Wang");
        req.gender = Gender::Female;

        run_assessment(&req, Locale::Zh, &FixedRiskModel(0.1), &explainer(), &store, &catalog)
            .unwrap();
        let load = store.load_all().unwrap();
        assert_eq!(
            load.records[0].record.gender,
            catalog.text(Locale::Zh, MessageKey::Female)
        );
    }

    #[test]
    fn contributions_are_ranked_with_colors() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("h.csv"));
        let outcome = run_assessment(
            &request("Zhao"),
            Locale::En,
            &FixedRiskModel(0.2),
            &explainer(),
            &store,
            &Catalog::builtin(),
        )
        .unwrap();
        // APTT (32) is the largest input, ACR (30) next.
        assert_eq!(outcome.contributions[0].contribution.feature, Feature::Aptt);
        assert_eq!(outcome.contributions[1].contribution.feature, Feature::Acr);
        assert_eq!(outcome.contributions[0].color, "red");
        assert_eq!(outcome.contributions.len(), 10);
    }

    #[test]
    fn model_failure_surfaces_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.csv");
        let store = HistoryStore::new(&path);
        let err = run_assessment(
            &request("Zhou"),
            Locale::En,
            &FailingRiskModel,
            &explainer(),
            &store,
            &Catalog::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, AssessmentError::Model(ModelError::Inference(_))));
        assert!(!path.exists());
    }
}
