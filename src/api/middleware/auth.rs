//! Bearer token session middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it against the
//! session table, and injects `ActiveSession` into request extensions for
//! downstream handlers.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{bearer_token, ActiveSession, ApiContext};
use crate::i18n::{Locale, MessageKey};

/// Require a live guest or investigator session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_session(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_session_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_session_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or_else(|| ApiError::internal("missing API context"))?;

    let session_required = ctx.text(Locale::default(), MessageKey::SessionRequired);

    let token = bearer_token(req.headers())
        .ok_or(ApiError::Unauthorized(session_required))?
        .to_string();

    let context = {
        let mut sessions = ctx.core.write_sessions()?;
        sessions
            .resolve(&token)
            .map_err(|_| ApiError::Unauthorized(session_required))?
    }; // guard dropped before any .await

    req.extensions_mut().insert(ActiveSession { token, context });

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));
    Ok(response)
}
