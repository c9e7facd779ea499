//! Prediction history: an append-only CSV file of past assessments.
//!
//! The file is the only persistent state. Rows are appended one per
//! assessment and removed only by a whole-file rewrite (temp file +
//! rename), so an interrupted delete leaves the previous file intact.
//!
//! Single-writer assumption: within the process every store call is
//! serialized by `CoreState`; nothing guards against a second process
//! writing the same file.

pub mod codec;
pub mod record;
mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use record::{Gender, NameFilter, PredictionRecord, StoredRecord, TIMESTAMP_FORMAT};
pub use store::{distinct_names, export_csv, filter_by_name, HistoryLoad, HistoryStore, LoadStatus};

/// File name offered for the CSV download.
pub const EXPORT_FILE_NAME: &str = "dr_prediction_history.csv";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("History file not found: {0}")]
    NotFound(PathBuf),

    #[error("History file has no header row: {0}")]
    MissingHeader(PathBuf),

    #[error("Atomic replace failed for {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HistoryError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
