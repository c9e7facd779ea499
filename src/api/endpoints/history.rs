//! Investigator-only history endpoints.
//!
//! `GET /api/history?name=`: records newest first, with delete labels
//! `GET /api/history/export?name=`: CSV download
//! `POST /api/history/delete`: remove rows by positional index

use std::collections::BTreeSet;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ActiveSession, ApiContext};
use crate::history::{
    self, HistoryError, LoadStatus, NameFilter, StoredRecord, EXPORT_FILE_NAME,
};
use crate::i18n::MessageKey;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct HistoryRow {
    #[serde(flatten)]
    pub record: StoredRecord,
    /// `Index {i}: {name} - {timestamp}`
    pub label: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub status: LoadStatus,
    /// Localized text for an empty or unreadable history.
    pub notice: Option<&'static str>,
    /// Every distinct patient name, for the filter selector.
    pub names: Vec<String>,
    pub records: Vec<HistoryRow>,
    pub skipped_rows: usize,
}

#[derive(Deserialize)]
pub struct DeleteRequest {
    pub indices: BTreeSet<usize>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub removed: usize,
    pub message: &'static str,
}

/// `GET /api/history`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<ActiveSession>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    session.require_investigator(&ctx)?;
    let locale = session.locale();

    let load = ctx
        .core
        .lock_history()?
        .load_all()
        .map_err(|e| ctx.internal_error(locale, e))?;
    let filter = NameFilter::from_query(query.name.as_deref());
    let mut records = history::filter_by_name(&load.records, &filter);
    records.sort_by(|a, b| {
        b.record
            .timestamp
            .cmp(&a.record.timestamp)
            .then(b.index.cmp(&a.index))
    });

    let notice = match &load.status {
        LoadStatus::FormatMismatch { .. } => {
            Some(ctx.text(locale, MessageKey::HistoryFormatMismatch))
        }
        _ if load.skipped_rows > 0 => {
            Some(ctx.text(locale, MessageKey::HistoryRowsUnreadable))
        }
        _ if load.records.is_empty() => Some(ctx.text(locale, MessageKey::NoHistory)),
        _ => None,
    };

    Ok(Json(HistoryResponse {
        names: history::distinct_names(&load.records),
        records: records
            .into_iter()
            .map(|record| HistoryRow {
                label: record.selector_label(),
                record,
            })
            .collect(),
        status: load.status,
        notice,
        skipped_rows: load.skipped_rows,
    }))
}

/// `GET /api/history/export`: the (optionally filtered) history as CSV.
pub async fn export(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<ActiveSession>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    session.require_investigator(&ctx)?;
    let locale = session.locale();

    let load = ctx
        .core
        .lock_history()?
        .load_all()
        .map_err(|e| ctx.internal_error(locale, e))?;
    let filter = NameFilter::from_query(query.name.as_deref());
    let body = history::export_csv(&history::filter_by_name(&load.records, &filter))
        .map_err(|e| ctx.internal_error(locale, e))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// `POST /api/history/delete`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<ActiveSession>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    session.require_investigator(&ctx)?;
    let locale = session.locale();

    if request.indices.is_empty() {
        return Err(ApiError::BadRequest(
            ctx.text(locale, MessageKey::SelectRecords).to_string(),
        ));
    }

    let removed = ctx
        .core
        .lock_history()?
        .delete(&request.indices)
        .map_err(|e: HistoryError| ApiError::DeleteFailed {
            message: ctx.text(locale, MessageKey::DeleteFailed),
            detail: e.to_string(),
        })?;

    tracing::info!(requested = request.indices.len(), removed, "History rows deleted");
    let message = if removed == 0 {
        MessageKey::DeleteNoneMatched
    } else {
        MessageKey::DeleteSuccess
    };
    Ok(Json(DeleteResponse {
        removed,
        message: ctx.text(locale, message),
    }))
}
