//! Clinical feature schema.
//!
//! The classifier consumes exactly ten lab values in a fixed order. That
//! order is shared by the model input, the attribution output and the
//! history CSV columns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of clinical inputs the classifier expects.
pub const FEATURE_COUNT: usize = 10;

/// One of the ten clinical inputs, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "Cortisol")]
    Cortisol,
    #[serde(rename = "CRP")]
    Crp,
    #[serde(rename = "Duration")]
    Duration,
    #[serde(rename = "CysC")]
    CysC,
    #[serde(rename = "C-P2")]
    CP2,
    #[serde(rename = "BUN")]
    Bun,
    #[serde(rename = "APTT")]
    Aptt,
    #[serde(rename = "RBG")]
    Rbg,
    #[serde(rename = "FT3")]
    Ft3,
    #[serde(rename = "ACR")]
    Acr,
}

impl Feature {
    /// All features in model/CSV column order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Cortisol,
        Feature::Crp,
        Feature::Duration,
        Feature::CysC,
        Feature::CP2,
        Feature::Bun,
        Feature::Aptt,
        Feature::Rbg,
        Feature::Ft3,
        Feature::Acr,
    ];

    /// Column / display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cortisol => "Cortisol",
            Self::Crp => "CRP",
            Self::Duration => "Duration",
            Self::CysC => "CysC",
            Self::CP2 => "C-P2",
            Self::Bun => "BUN",
            Self::Aptt => "APTT",
            Self::Rbg => "RBG",
            Self::Ft3 => "FT3",
            Self::Acr => "ACR",
        }
    }

    /// Measurement unit shown next to the input field.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Cortisol => "μg/L",
            Self::Crp => "mg/L",
            Self::Duration => "year",
            Self::CysC => "mg/L",
            Self::CP2 => "ng/ml",
            Self::Bun => "mmol/L",
            Self::Aptt => "s",
            Self::Rbg => "mmol/L",
            Self::Ft3 => "pmol/L",
            Self::Acr => "Urine Protein/Creatinine Ratio",
        }
    }

    /// Position in the canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature name + unit, as served to the client form.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureDescriptor {
    pub name: &'static str,
    pub unit: &'static str,
}

pub fn descriptors() -> Vec<FeatureDescriptor> {
    Feature::ALL
        .iter()
        .map(|f| FeatureDescriptor {
            name: f.as_str(),
            unit: f.unit(),
        })
        .collect()
}

/// The ten clinical values for one patient. Unset values are 0.0.
///
/// Serializes as a JSON object keyed by feature name; missing keys
/// deserialize to 0.0 and unknown keys are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = value;
    }

    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    /// Values in canonical order.
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |f| (*f, self.get(*f)))
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.as_str(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FeatureVector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = std::collections::HashMap::<String, f64>::deserialize(deserializer)?;
        let mut vector = FeatureVector::new();
        for (name, value) in raw {
            let feature = Feature::from_name(&name).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown clinical feature: {name}"))
            })?;
            if !value.is_finite() {
                return Err(serde::de::Error::custom(format!(
                    "{name} must be a finite number"
                )));
            }
            vector.set(feature, value);
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_matches_history_columns() {
        let names: Vec<&str> = Feature::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(
            names,
            ["Cortisol", "CRP", "Duration", "CysC", "C-P2", "BUN", "APTT", "RBG", "FT3", "ACR"]
        );
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn missing_keys_default_to_zero() {
        let v: FeatureVector = serde_json::from_str(r#"{"CRP": 3.5, "C-P2": 2.8}"#).unwrap();
        assert_eq!(v.get(Feature::Crp), 3.5);
        assert_eq!(v.get(Feature::CP2), 2.8);
        assert_eq!(v.get(Feature::Cortisol), 0.0);
        assert_eq!(v.get(Feature::Acr), 0.0);
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let result: Result<FeatureVector, _> = serde_json::from_str(r#"{"HbA1c": 7.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn serializes_as_named_map() {
        let v = FeatureVector::new().with(Feature::Rbg, 7.2);
        let json = serde_json::to_value(v).unwrap();
        assert_eq!(json["RBG"], 7.2);
        assert_eq!(json["ACR"], 0.0);
        assert_eq!(json.as_object().unwrap().len(), FEATURE_COUNT);
    }

    #[test]
    fn units_cover_every_feature() {
        let d = descriptors();
        assert_eq!(d.len(), FEATURE_COUNT);
        assert_eq!(d[0].unit, "μg/L");
        assert_eq!(d[9].unit, "Urine Protein/Creatinine Ratio");
    }
}
