//! Static reference data for rendering the form.
//!
//! `GET /api/i18n/:locale`: message table for one language
//! `GET /api/features`: the clinical inputs in model order

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::features::{self, FeatureDescriptor};
use crate::i18n::Locale;

#[derive(Serialize)]
pub struct MessagesResponse {
    pub locale: Locale,
    pub messages: BTreeMap<&'static str, &'static str>,
}

#[derive(Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<FeatureDescriptor>,
}

pub async fn messages(
    State(ctx): State<ApiContext>,
    Path(tag): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let locale = Locale::from_tag(&tag)
        .ok_or_else(|| ApiError::NotFound(format!("Unsupported locale '{tag}'")))?;
    Ok(Json(MessagesResponse {
        locale,
        messages: ctx.core.catalog().table(locale),
    }))
}

pub async fn features() -> Json<FeaturesResponse> {
    Json(FeaturesResponse {
        features: features::descriptors(),
    })
}
