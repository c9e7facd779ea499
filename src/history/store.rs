use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::codec::{self, ColumnMap};
use super::record::{NameFilter, PredictionRecord, StoredRecord};
use super::{HistoryError, EXPORT_FILE_NAME};

// ═══════════════════════════════════════════════════════════
// Load result
// ═══════════════════════════════════════════════════════════

/// How the history file looked when it was loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadStatus {
    /// No file on disk. Equivalent to an empty history.
    Missing,
    /// The file exists but has zero length.
    Empty,
    /// Header matched; `records` holds every readable row.
    Loaded,
    /// Header lacks required columns. `records` is empty.
    FormatMismatch { missing_columns: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct HistoryLoad {
    pub records: Vec<StoredRecord>,
    pub status: LoadStatus,
    /// Data rows present in the file that could not be parsed.
    pub skipped_rows: usize,
}

impl HistoryLoad {
    fn empty(status: LoadStatus) -> Self {
        Self {
            records: Vec::new(),
            status,
            skipped_rows: 0,
        }
    }

    pub fn is_format_mismatch(&self) -> bool {
        matches!(self.status, LoadStatus::FormatMismatch { .. })
    }
}

// ═══════════════════════════════════════════════════════════
// HistoryStore
// ═══════════════════════════════════════════════════════════

/// CSV-backed prediction history.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with the header row if it is missing or zero-length.
    ///
    /// Returns `true` when the file was (re)created. Calling it on an
    /// initialized file changes nothing.
    pub fn ensure_initialized(&self) -> Result<bool, HistoryError> {
        if self.has_content()? {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| HistoryError::io(parent, e))?;
            }
        }

        let file = File::create(&self.path).map_err(|e| HistoryError::io(&self.path, e))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(codec::header())?;
        writer.flush().map_err(|e| HistoryError::io(&self.path, e))?;

        tracing::info!(path = %self.path.display(), "History file initialized");
        Ok(true)
    }

    /// Append one row. Existing rows are never rewritten.
    pub fn append(&self, record: &PredictionRecord) -> Result<(), HistoryError> {
        self.ensure_initialized()?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HistoryError::io(&self.path, e))?;

        // A hand-edited file may lack the final newline; the new row must
        // not be glued onto the last one.
        if !ends_with_newline(&mut file).map_err(|e| HistoryError::io(&self.path, e))? {
            file.write_all(b"\n")
                .map_err(|e| HistoryError::io(&self.path, e))?;
        }

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(codec::encode_row(record))?;
        writer.flush().map_err(|e| HistoryError::io(&self.path, e))?;

        tracing::info!(
            probability = record.risk_probability,
            "Prediction record appended"
        );
        Ok(())
    }

    /// Load every readable record with its positional index.
    ///
    /// A missing or empty file yields an empty history, and a header without
    /// the required columns yields `LoadStatus::FormatMismatch`; neither is
    /// an error.
    pub fn load_all(&self) -> Result<HistoryLoad, HistoryError> {
        let Some(bytes) = self.read_bytes()? else {
            return Ok(HistoryLoad::empty(LoadStatus::Missing));
        };
        if bytes.is_empty() {
            return Ok(HistoryLoad::empty(LoadStatus::Empty));
        }

        let (text, encoding) = codec::decode_text(&bytes);
        if encoding != encoding_rs::UTF_8 {
            tracing::warn!(
                encoding = encoding.name(),
                "History file is not UTF-8, decoded with fallback encoding"
            );
        }

        let mut reader = csv_reader(text.as_bytes());
        let header = reader.headers()?.clone();
        let columns = match ColumnMap::resolve(&header) {
            Ok(columns) => columns,
            Err(missing_columns) => {
                tracing::warn!(?missing_columns, "History file format mismatch");
                return Ok(HistoryLoad::empty(LoadStatus::FormatMismatch { missing_columns }));
            }
        };

        let mut records = Vec::new();
        let mut skipped_rows = 0;
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            match columns.decode(&row) {
                Ok(record) => records.push(StoredRecord { index, record }),
                Err(reason) => {
                    skipped_rows += 1;
                    tracing::warn!(index, %reason, "Skipping unreadable history row");
                }
            }
        }

        Ok(HistoryLoad {
            records,
            status: LoadStatus::Loaded,
            skipped_rows,
        })
    }

    /// Remove the rows at the given zero-based positions and rewrite the file.
    ///
    /// Positions refer to the file as it is re-read now. Out-of-range
    /// positions are ignored. Unparseable rows that are not selected are
    /// written back verbatim. Returns the number of rows removed.
    pub fn delete(&self, indices: &BTreeSet<usize>) -> Result<usize, HistoryError> {
        let bytes = self
            .read_bytes()?
            .ok_or_else(|| HistoryError::NotFound(self.path.clone()))?;

        let (text, _) = codec::decode_text(&bytes);
        let mut reader = csv_reader(text.as_bytes());
        let header = reader.headers()?.clone();
        if header.is_empty() {
            return Err(HistoryError::MissingHeader(self.path.clone()));
        }
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;

        let before = rows.len();
        let kept: Vec<csv::StringRecord> = rows
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, row)| row)
            .collect();
        let removed = before - kept.len();

        if removed == 0 {
            return Ok(0);
        }

        self.replace_with(&header, &kept)?;
        tracing::info!(removed, remaining = kept.len(), "History rows deleted");
        Ok(removed)
    }

    /// Write header + rows to a sibling temp file, then rename it over the
    /// history file.
    fn replace_with(
        &self,
        header: &csv::StringRecord,
        rows: &[csv::StringRecord],
    ) -> Result<(), HistoryError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let tmp = tempfile::Builder::new()
            .prefix(".prediction_history")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| HistoryError::io(dir, e))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(tmp.as_file());
            writer.write_record(header)?;
            for row in rows {
                writer.write_record(row)?;
            }
            writer.flush().map_err(|e| HistoryError::io(tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| HistoryError::io(tmp.path(), e))?;

        tmp.persist(&self.path).map_err(|e| HistoryError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }

    fn has_content(&self) -> Result<bool, HistoryError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() > 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HistoryError::io(&self.path, e)),
        }
    }

    fn read_bytes(&self) -> Result<Option<Vec<u8>>, HistoryError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HistoryError::io(&self.path, e)),
        }
    }
}

fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes)
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

// ═══════════════════════════════════════════════════════════
// Views over loaded records
// ═══════════════════════════════════════════════════════════

/// Records matching the filter, in input order.
pub fn filter_by_name(records: &[StoredRecord], filter: &NameFilter) -> Vec<StoredRecord> {
    records
        .iter()
        .filter(|r| filter.matches(&r.record))
        .cloned()
        .collect()
}

/// Unique patient names in first-seen order.
pub fn distinct_names(records: &[StoredRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.record.patient_name.as_str()))
        .map(|r| r.record.patient_name.clone())
        .collect()
}

/// Serialize records in the persisted CSV shape, header included.
pub fn export_csv(records: &[StoredRecord]) -> Result<Vec<u8>, HistoryError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(codec::header())?;
    for stored in records {
        writer.write_record(codec::encode_row(&stored.record))?;
    }
    writer
        .into_inner()
        .map_err(|e| HistoryError::io(EXPORT_FILE_NAME, e.into_error()))
}
