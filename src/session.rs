//! Per-client session context.
//!
//! Each browser holds a bearer token issued on guest entry or investigator
//! login. The token maps to a `SessionContext` carrying role, locale and the
//! last submitted form input. Sessions live in memory only; logout drops
//! the entry and a restart drops them all.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Role;
use crate::features::FeatureVector;
use crate::history::Gender;
use crate::i18n::Locale;

/// Sessions idle longer than this are discarded.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,
    #[error("Session expired")]
    Expired,
}

/// Form values kept between requests so the client can re-render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormInput {
    pub patient_name: String,
    pub gender: Gender,
    pub features: FeatureVector,
}

impl Default for FormInput {
    fn default() -> Self {
        Self {
            patient_name: String::new(),
            gender: Gender::Male,
            features: FeatureVector::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionContext {
    pub authenticated: bool,
    pub role: Role,
    pub locale: Locale,
    pub input: FormInput,
}

impl SessionContext {
    pub fn new(role: Role, locale: Locale) -> Self {
        Self {
            authenticated: true,
            role,
            locale,
            input: FormInput::default(),
        }
    }
}

struct SessionEntry {
    context: SessionContext,
    last_seen: Instant,
}

/// Token-keyed session table. Tokens are stored only as SHA-256 hashes.
pub struct SessionStore {
    sessions: HashMap<[u8; 32], SessionEntry>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
        }
    }

    /// Start a session and return its bearer token.
    pub fn open(&mut self, role: Role, locale: Locale) -> (String, SessionContext) {
        self.purge_idle();
        let token = generate_token();
        let context = SessionContext::new(role, locale);
        self.sessions.insert(
            hash_token(&token),
            SessionEntry {
                context: context.clone(),
                last_seen: Instant::now(),
            },
        );
        tracing::info!(?role, locale = locale.tag(), active = self.sessions.len(), "Session opened");
        (token, context)
    }

    /// Look up a token and refresh its idle clock.
    pub fn resolve(&mut self, token: &str) -> Result<SessionContext, SessionError> {
        self.update(token, |_| {})
    }

    /// Apply `f` to the session behind `token` and return the new context.
    pub fn update<F>(&mut self, token: &str, f: F) -> Result<SessionContext, SessionError>
    where
        F: FnOnce(&mut SessionContext),
    {
        let key = hash_token(token);
        let entry = self.sessions.get_mut(&key).ok_or(SessionError::NotFound)?;
        if entry.last_seen.elapsed() >= self.idle_timeout {
            self.sessions.remove(&key);
            return Err(SessionError::Expired);
        }
        entry.last_seen = Instant::now();
        f(&mut entry.context);
        Ok(entry.context.clone())
    }

    pub fn set_locale(&mut self, token: &str, locale: Locale) -> Result<SessionContext, SessionError> {
        self.update(token, |ctx| ctx.locale = locale)
    }

    pub fn remember_input(&mut self, token: &str, input: FormInput) -> Result<SessionContext, SessionError> {
        self.update(token, |ctx| ctx.input = input)
    }

    /// Drop a session. Returns whether it existed.
    pub fn close(&mut self, token: &str) -> bool {
        let removed = self.sessions.remove(&hash_token(token)).is_some();
        if removed {
            tracing::info!(active = self.sessions.len(), "Session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn purge_idle(&mut self) {
        let timeout = self.idle_timeout;
        self.sessions.retain(|_, entry| entry.last_seen.elapsed() < timeout);
    }
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;

    #[test]
    fn guest_session_round_trip() {
        let mut store = SessionStore::new();
        let (token, ctx) = store.open(Role::Guest, Locale::En);
        assert!(ctx.authenticated);
        assert_eq!(ctx.role, Role::Guest);
        assert_eq!(store.resolve(&token).unwrap(), ctx);
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let mut store = SessionStore::new();
        assert_eq!(store.resolve("nope"), Err(SessionError::NotFound));
    }

    #[test]
    fn logout_resets_everything() {
        let mut store = SessionStore::new();
        let (token, _) = store.open(Role::Investigator, Locale::Zh);
        let input = FormInput {
            patient_name: "Zhang San".into(),
            gender: Gender::Female,
            features: FeatureVector::new().with(Feature::Cortisol, 15.2),
        };
        store.remember_input(&token, input).unwrap();
        assert!(store.close(&token));
        assert!(!store.close(&token));
        assert_eq!(store.resolve(&token), Err(SessionError::NotFound));

        // A fresh session starts from defaults
        let (token, ctx) = store.open(Role::Guest, Locale::En);
        assert_eq!(ctx.input, FormInput::default());
        assert_eq!(store.resolve(&token).unwrap().input.patient_name, "");
    }

    #[test]
    fn locale_and_input_persist_within_session() {
        let mut store = SessionStore::new();
        let (token, _) = store.open(Role::Guest, Locale::En);
        store.set_locale(&token, Locale::Zh).unwrap();
        let input = FormInput {
            patient_name: "Li".into(),
            gender: Gender::Other,
            features: FeatureVector::new().with(Feature::Acr, 30.0),
        };
        store.remember_input(&token, input.clone()).unwrap();
        let ctx = store.resolve(&token).unwrap();
        assert_eq!(ctx.locale, Locale::Zh);
        assert_eq!(ctx.input, input);
    }

    #[test]
    fn sessions_are_isolated() {
        let mut store = SessionStore::new();
        let (a, _) = store.open(Role::Guest, Locale::En);
        let (b, _) = store.open(Role::Investigator, Locale::En);
        store.set_locale(&a, Locale::Zh).unwrap();
        assert_eq!(store.resolve(&b).unwrap().locale, Locale::En);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn idle_sessions_expire() {
        let mut store = SessionStore::with_idle_timeout(Duration::ZERO);
        let (token, _) = store.open(Role::Guest, Locale::En);
        assert_eq!(store.resolve(&token), Err(SessionError::Expired));
        assert!(store.is_empty());
    }
}
