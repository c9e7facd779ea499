//! Shared types for the API layer.

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::i18n::{Locale, MessageKey};
use crate::session::SessionContext;

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Localized text for `key`.
    pub fn text(&self, locale: Locale, key: MessageKey) -> &'static str {
        self.core.catalog().text(locale, key)
    }

    /// Internal error whose client message is in `locale`.
    pub fn internal_error(&self, locale: Locale, detail: impl ToString) -> ApiError {
        ApiError::Internal {
            message: self.text(locale, MessageKey::InternalError),
            detail: detail.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Session context, injected by the session middleware
// ═══════════════════════════════════════════════════════════

/// The caller's resolved session, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub token: String,
    pub context: SessionContext,
}

impl ActiveSession {
    pub fn locale(&self) -> Locale {
        self.context.locale
    }

    /// History routes are investigator-only; guests get the login prompt.
    pub fn require_investigator(&self, ctx: &ApiContext) -> Result<(), ApiError> {
        if self.context.role.can_manage_history() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(ctx.text(self.locale(), MessageKey::LoginPrompt)))
        }
    }
}

/// `Authorization: Bearer <token>`, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
