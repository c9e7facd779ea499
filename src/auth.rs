//! Role model and credential verification.
//!
//! A single investigator credential pair is configured at startup. Guests
//! need no credential.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const DEFAULT_INVESTIGATOR_USER: &str = "DR";
pub const DEFAULT_INVESTIGATOR_PASSWORD: &str = "000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Investigator,
}

impl Role {
    /// Only investigators may read, export or delete history.
    pub fn can_manage_history(self) -> bool {
        matches!(self, Self::Investigator)
    }
}

pub trait CredentialVerifier: Send + Sync {
    /// `Some(role)` for a recognized pair, `None` otherwise.
    fn verify(&self, username: &str, password: &str) -> Option<Role>;
}

/// One fixed investigator pair. Stored as SHA-256 digests and compared in
/// constant time.
pub struct StaticCredentials {
    user_hash: [u8; 32],
    password_hash: [u8; 32],
}

impl StaticCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            user_hash: digest(username),
            password_hash: digest(password),
        }
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_INVESTIGATOR_USER, DEFAULT_INVESTIGATOR_PASSWORD)
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> Option<Role> {
        let user_ok = self.user_hash.ct_eq(&digest(username));
        let password_ok = self.password_hash.ct_eq(&digest(password));
        if (user_ok & password_ok).unwrap_u8() == 1 {
            Some(Role::Investigator)
        } else {
            None
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
