use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;
use crate::i18n::{Catalog, Locale, MessageKey};

/// Timestamp pattern used in the history file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Patient gender as selected in the form. Persisted as the localized label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn message_key(self) -> MessageKey {
        match self {
            Self::Male => MessageKey::Male,
            Self::Female => MessageKey::Female,
            Self::Other => MessageKey::Other,
        }
    }

    /// Display text stored in the `Gender` column.
    pub fn label(self, catalog: &Catalog, locale: Locale) -> String {
        catalog.text(locale, self.message_key()).to_string()
    }
}

/// One prediction, as persisted in a single history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub patient_name: String,
    pub gender: String,
    pub features: FeatureVector,
    pub risk_probability: f64,
}

impl PredictionRecord {
    /// Build a record stamped with the current local time (second precision).
    pub fn now(
        patient_name: impl Into<String>,
        gender: impl Into<String>,
        features: FeatureVector,
        risk_probability: f64,
    ) -> Self {
        Self {
            timestamp: truncate_to_seconds(Local::now().naive_local()),
            patient_name: patient_name.into(),
            gender: gender.into(),
            features,
            risk_probability,
        }
    }

    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

fn truncate_to_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// A loaded record and its zero-based row position in the file snapshot.
///
/// The index is only meaningful against the snapshot it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub index: usize,
    #[serde(flatten)]
    pub record: PredictionRecord,
}

impl StoredRecord {
    /// Label used by the delete selector, e.g. `Index 3: Zhang - 2024-05-01 10:00:00`.
    pub fn selector_label(&self) -> String {
        format!(
            "Index {}: {} - {}",
            self.index,
            self.record.patient_name,
            self.record.timestamp_text()
        )
    }
}

/// Name filter for the history view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameFilter {
    All,
    Exact(String),
}

impl NameFilter {
    /// `None` or an empty query means every record.
    pub fn from_query(name: Option<&str>) -> Self {
        match name {
            Some(n) if !n.is_empty() => Self::Exact(n.to_string()),
            _ => Self::All,
        }
    }

    pub fn matches(&self, record: &PredictionRecord) -> bool {
        match self {
            Self::All => true,
            Self::Exact(name) => record.patient_name == *name,
        }
    }
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
