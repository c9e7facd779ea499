//! `POST /api/assessments`: run one risk assessment.

use axum::extract::State;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ActiveSession, ApiContext};
use crate::assessment::{self, AssessmentError, AssessmentOutcome, AssessmentRequest};
use crate::i18n::MessageKey;
use crate::session::FormInput;

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<ActiveSession>,
    Json(request): Json<AssessmentRequest>,
) -> Result<Json<AssessmentOutcome>, ApiError> {
    let locale = session.locale();

    // The form keeps what was submitted, whether or not it validates.
    ctx.core.write_sessions()?.remember_input(
        &session.token,
        FormInput {
            patient_name: request.patient_name.clone(),
            gender: request.gender,
            features: request.features,
        },
    )?;

    let store = ctx.core.lock_history()?;
    let outcome = assessment::run_assessment(
        &request,
        locale,
        ctx.core.model(),
        ctx.core.explainer(),
        &store,
        ctx.core.catalog(),
    )
    .map_err(|e| match e {
        AssessmentError::MissingName => {
            ApiError::NameRequired(ctx.text(locale, MessageKey::WarningName))
        }
        AssessmentError::Model(e) => ctx.internal_error(locale, e),
    })?;

    Ok(Json(outcome))
}
