//! Process-wide application state.
//!
//! `CoreState` is built once at startup and shared behind `Arc` by every
//! request handler. The model and explainer are read-only; the history
//! store and session table sit behind locks.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::auth::{CredentialVerifier, StaticCredentials};
use crate::config::AppConfig;
use crate::history::HistoryStore;
use crate::i18n::{Catalog, I18nError, MessageKey};
use crate::model::{CatBoostClassifier, Explainer, ModelError, RiskModel, TreeExplainer};
use crate::session::SessionStore;

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
}

/// Failures that stop the service from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Cannot load risk model: {0}")]
    Model(#[source] ModelError),
    #[error("Cannot load explainer: {0}")]
    Explainer(#[source] ModelError),
    #[error("Message catalog incomplete: {0}")]
    Catalog(#[from] I18nError),
    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl StartupError {
    /// User-facing summary for failures that have one.
    pub fn message_key(&self) -> Option<MessageKey> {
        match self {
            Self::Model(_) | Self::Explainer(_) => Some(MessageKey::ModelLoadFailed),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    model: Arc<dyn RiskModel>,
    explainer: Arc<dyn Explainer>,
    credentials: Arc<dyn CredentialVerifier>,
    catalog: Catalog,
    /// Serializes every read-modify-write of the history file.
    history: Mutex<HistoryStore>,
    sessions: RwLock<SessionStore>,
}

impl CoreState {
    pub fn new(
        model: Arc<dyn RiskModel>,
        explainer: Arc<dyn Explainer>,
        credentials: Arc<dyn CredentialVerifier>,
        catalog: Catalog,
        history: HistoryStore,
    ) -> Self {
        Self {
            model,
            explainer,
            credentials,
            catalog,
            history: Mutex::new(history),
            sessions: RwLock::new(SessionStore::new()),
        }
    }

    /// Load artifacts and validate the catalog. Any failure is fatal.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let catalog = Catalog::builtin();
        catalog.validate()?;

        let model = CatBoostClassifier::load(&config.model_path).map_err(StartupError::Model)?;
        let explainer =
            TreeExplainer::load(&config.explainer_path).map_err(StartupError::Explainer)?;
        let credentials =
            StaticCredentials::new(&config.investigator_user, &config.investigator_password);

        let history = HistoryStore::new(&config.history_path);
        // Not fatal: the store retries on first append.
        if let Err(e) = history.ensure_initialized() {
            tracing::warn!(error = %e, "History file could not be initialized");
        }

        Ok(Self::new(
            Arc::new(model),
            Arc::new(explainer),
            Arc::new(credentials),
            catalog,
            history,
        ))
    }

    pub fn model(&self) -> &dyn RiskModel {
        self.model.as_ref()
    }

    pub fn explainer(&self) -> &dyn Explainer {
        self.explainer.as_ref()
    }

    pub fn credentials(&self) -> &dyn CredentialVerifier {
        self.credentials.as_ref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ── History (exclusive) ─────────────────────────────────

    pub fn lock_history(&self) -> Result<MutexGuard<'_, HistoryStore>, CoreError> {
        self.history.lock().map_err(|_| CoreError::LockPoisoned)
    }

    // ── Sessions ────────────────────────────────────────────

    pub fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionStore>, CoreError> {
        self.sessions.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionStore>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::model::testing::{FixedRiskModel, LinearExplainer};

    /// State with a fixed-probability model and a history file in `dir`.
    pub fn core_with_probability(dir: &std::path::Path, probability: f64) -> Arc<CoreState> {
        core_with_model(dir, Arc::new(FixedRiskModel(probability)))
    }

    pub fn core_with_model(dir: &std::path::Path, model: Arc<dyn RiskModel>) -> Arc<CoreState> {
        Arc::new(CoreState::new(
            model,
            Arc::new(LinearExplainer {
                base: -0.5,
                weight: 0.01,
            }),
            Arc::new(StaticCredentials::default()),
            Catalog::builtin(),
            HistoryStore::new(dir.join("history").join("prediction_history.csv")),
        ))
    }
}
