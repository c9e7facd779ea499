//! Session endpoints.
//!
//! `POST /api/session/guest`: open a guest session
//! `POST /api/session/login`: open an investigator session
//! `POST /api/session/logout`: drop the caller's session
//! `GET /api/session`: current role, locale and cached form input
//! `PUT /api/session/locale`: switch language
//! `PUT /api/session/input`: cache form input without assessing

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{bearer_token, ActiveSession, ApiContext};
use crate::auth::Role;
use crate::i18n::{Locale, MessageKey};
use crate::session::{FormInput, SessionContext};

#[derive(Deserialize, Default)]
pub struct GuestRequest {
    #[serde(default)]
    pub locale: Option<Locale>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub locale: Option<Locale>,
}

#[derive(Deserialize)]
pub struct LocaleRequest {
    pub locale: Locale,
}

#[derive(Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub context: SessionContext,
    /// "Logged in as: …" text in the session's language.
    pub role_label: &'static str,
}

impl SessionView {
    fn new(ctx: &ApiContext, context: SessionContext) -> Self {
        let key = match context.role {
            Role::Guest => MessageKey::Guest,
            Role::Investigator => MessageKey::Investigator,
        };
        Self {
            role_label: ctx.text(context.locale, key),
            context,
        }
    }
}

#[derive(Serialize)]
pub struct OpenedSession {
    pub token: String,
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// `POST /api/session/guest`: no credential needed.
pub async fn guest(
    State(ctx): State<ApiContext>,
    body: Option<Json<GuestRequest>>,
) -> Result<Json<OpenedSession>, ApiError> {
    let locale = body.and_then(|Json(b)| b.locale).unwrap_or_default();
    let (token, context) = ctx.core.write_sessions()?.open(Role::Guest, locale);
    Ok(Json(OpenedSession {
        token,
        session: SessionView::new(&ctx, context),
    }))
}

/// `POST /api/session/login`: investigator credential check.
///
/// A bearer token sent along (e.g. from a guest session) is replaced; its
/// locale carries over unless the body names one.
pub async fn login(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<OpenedSession>, ApiError> {
    let mut sessions = ctx.core.write_sessions()?;

    let previous = bearer_token(&headers).and_then(|t| sessions.resolve(t).ok().map(|c| (t, c)));
    let locale = request
        .locale
        .or_else(|| previous.as_ref().map(|(_, c)| c.locale))
        .unwrap_or_default();

    let role = ctx
        .core
        .credentials()
        .verify(&request.username, &request.password)
        .ok_or_else(|| {
            tracing::warn!("Investigator login rejected");
            ApiError::InvalidCredentials(ctx.text(locale, MessageKey::InvalidCredentials))
        })?;

    if let Some((old_token, _)) = previous {
        sessions.close(old_token);
    }
    let (token, context) = sessions.open(role, locale);
    drop(sessions);

    Ok(Json(OpenedSession {
        token,
        session: SessionView::new(&ctx, context),
    }))
}

/// `POST /api/session/logout`: everything held by the session is dropped.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<ActiveSession>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let logged_out = ctx.core.write_sessions()?.close(&session.token);
    Ok(Json(LogoutResponse { logged_out }))
}

/// `GET /api/session`
pub async fn current(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<ActiveSession>,
) -> Json<SessionView> {
    Json(SessionView::new(&ctx, session.context))
}

/// `PUT /api/session/locale`
pub async fn set_locale(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<ActiveSession>,
    Json(request): Json<LocaleRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let context = ctx
        .core
        .write_sessions()?
        .set_locale(&session.token, request.locale)?;
    Ok(Json(SessionView::new(&ctx, context)))
}

/// `PUT /api/session/input`
pub async fn set_input(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<ActiveSession>,
    Json(input): Json<FormInput>,
) -> Result<Json<SessionView>, ApiError> {
    let context = ctx
        .core
        .write_sessions()?
        .remember_input(&session.token, input)?;
    Ok(Json(SessionView::new(&ctx, context)))
}
