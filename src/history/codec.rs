//! CSV row layout and text decoding for the history file.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use encoding_rs::{Encoding, GBK, WINDOWS_1252};

use super::record::{PredictionRecord, TIMESTAMP_FORMAT};
use crate::features::{Feature, FeatureVector, FEATURE_COUNT};

pub const COL_TIMESTAMP: &str = "Timestamp";
pub const COL_NAME: &str = "Name";
pub const COL_GENDER: &str = "Gender";
pub const COL_PROBABILITY: &str = "Risk_Probability";

/// Total number of columns in a well-formed row.
pub const COLUMN_COUNT: usize = 3 + FEATURE_COUNT + 1;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Header row in persisted column order.
pub fn header() -> Vec<&'static str> {
    let mut cols = Vec::with_capacity(COLUMN_COUNT);
    cols.extend([COL_TIMESTAMP, COL_NAME, COL_GENDER]);
    cols.extend(Feature::ALL.iter().map(|f| f.as_str()));
    cols.push(COL_PROBABILITY);
    cols
}

/// Serialize one record into its row cells.
pub fn encode_row(record: &PredictionRecord) -> Vec<String> {
    let mut row = Vec::with_capacity(COLUMN_COUNT);
    row.push(record.timestamp_text());
    row.push(record.patient_name.clone());
    row.push(record.gender.clone());
    row.extend(record.features.values().iter().map(|v| v.to_string()));
    row.push(record.risk_probability.to_string());
    row
}

/// Positions of the required columns within a file's header.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    timestamp: usize,
    name: usize,
    gender: usize,
    features: [usize; FEATURE_COUNT],
    probability: usize,
}

impl ColumnMap {
    /// Locate every required column by name. Returns the missing names on failure.
    pub fn resolve(header: &csv::StringRecord) -> Result<Self, Vec<String>> {
        let mut missing = Vec::new();
        let mut find = |name: &str| -> usize {
            match header.iter().position(|h| h.trim() == name) {
                Some(i) => i,
                None => {
                    missing.push(name.to_string());
                    usize::MAX
                }
            }
        };

        let timestamp = find(COL_TIMESTAMP);
        let name = find(COL_NAME);
        let gender = find(COL_GENDER);
        let mut features = [0usize; FEATURE_COUNT];
        for feature in Feature::ALL {
            features[feature.index()] = find(feature.as_str());
        }
        let probability = find(COL_PROBABILITY);

        if missing.is_empty() {
            Ok(Self {
                timestamp,
                name,
                gender,
                features,
                probability,
            })
        } else {
            Err(missing)
        }
    }

    /// Parse one data row. Errors describe the first offending cell.
    pub fn decode(&self, row: &csv::StringRecord) -> Result<PredictionRecord, String> {
        let ts_raw = cell(row, self.timestamp, COL_TIMESTAMP)?.trim();
        let timestamp = NaiveDateTime::parse_from_str(ts_raw, TIMESTAMP_FORMAT)
            .map_err(|_| format!("bad timestamp: {ts_raw:?}"))?;

        let mut features = FeatureVector::new();
        for feature in Feature::ALL {
            let value = number(row, self.features[feature.index()], feature.as_str())?;
            features.set(feature, value);
        }

        Ok(PredictionRecord {
            timestamp,
            patient_name: cell(row, self.name, COL_NAME)?.to_string(),
            gender: cell(row, self.gender, COL_GENDER)?.to_string(),
            features,
            risk_probability: number(row, self.probability, COL_PROBABILITY)?,
        })
    }
}

fn cell<'r>(row: &'r csv::StringRecord, i: usize, col: &str) -> Result<&'r str, String> {
    row.get(i).ok_or_else(|| format!("missing {col} cell"))
}

/// Empty numeric cells read as 0.0, matching the form default.
fn number(row: &csv::StringRecord, i: usize, col: &str) -> Result<f64, String> {
    let raw = cell(row, i, col)?.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse::<f64>()
        .map_err(|_| format!("{col} is not a number: {raw:?}"))
}

/// Decode file bytes: UTF-8 first (BOM tolerated), then the legacy fallbacks.
///
/// Returns the text and the encoding that succeeded.
pub fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(body) {
        return (Cow::Borrowed(text), encoding_rs::UTF_8);
    }
    if let Some(text) = GBK.decode_without_bom_handling_and_without_replacement(body) {
        return (text, GBK);
    }
    // Windows-1252 maps every byte, so this never fails.
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(body);
    (text, WINDOWS_1252)
}
