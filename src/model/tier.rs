use serde::Serialize;

use crate::i18n::MessageKey;

/// Probabilities at or above this are at least Medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.30;
/// Probabilities at or above this are High risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.70;

/// Three-level risk label derived from the predicted probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// `[0, 0.30)` Low, `[0.30, 0.70)` Medium, `[0.70, 1]` High.
    pub fn from_probability(probability: f64) -> Self {
        if probability < MEDIUM_RISK_THRESHOLD {
            Self::Low
        } else if probability < HIGH_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn message_key(self) -> MessageKey {
        match self {
            Self::Low => MessageKey::LowRisk,
            Self::Medium => MessageKey::MediumRisk,
            Self::High => MessageKey::HighRisk,
        }
    }

    /// Color used for the result banner.
    pub fn color(self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "orange",
            Self::High => "red",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_half_open() {
        assert_eq!(RiskTier::from_probability(0.2999), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(0.30), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.6999), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.70), RiskTier::High);
    }

    #[test]
    fn extremes() {
        assert_eq!(RiskTier::from_probability(0.0), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(1.0), RiskTier::High);
    }

    #[test]
    fn display_attributes() {
        assert_eq!(RiskTier::Low.color(), "green");
        assert_eq!(RiskTier::Medium.color(), "orange");
        assert_eq!(RiskTier::High.color(), "red");
        assert_eq!(RiskTier::Medium.message_key(), MessageKey::MediumRisk);
        assert_eq!(serde_json::to_string(&RiskTier::High).unwrap(), "\"high\"");
    }
}
