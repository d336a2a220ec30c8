//! File-backed Identity Provider
//!
//! Accounts loaded once from a JSON array:
//!
//! ```json
//! [{ "id": "u-1", "email": "inspector@example.com", "role": "admin",
//!    "passwordHash": "$argon2id$v=19$..." }]
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use platform::password::{ClearTextPassword, HashedPassword, verify_dummy};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::identity::{CredentialVerifier, IdentityError, ProfileStore, UserProfile};
use crate::domain::value_object::{email::Email, user_id::UserId, user_role::UserRole};

#[derive(Debug, Error)]
pub enum StaticIdentityError {
    #[error("Failed to read users file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse users file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid user entry {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserEntry {
    id: String,
    email: String,
    #[serde(default)]
    role: UserRole,
    password_hash: String,
}

struct Account {
    user_id: UserId,
    password_hash: HashedPassword,
}

/// Users file contents, shared by clones
#[derive(Clone)]
pub struct StaticIdentityProvider {
    by_email: Arc<HashMap<Email, Account>>,
    profiles: Arc<HashMap<UserId, UserProfile>>,
}

impl StaticIdentityProvider {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StaticIdentityError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, StaticIdentityError> {
        let entries: Vec<UserEntry> = serde_json::from_str(raw)?;

        let mut by_email = HashMap::with_capacity(entries.len());
        let mut profiles = HashMap::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let invalid = |reason: &str| StaticIdentityError::InvalidEntry {
                index,
                reason: reason.to_string(),
            };

            let user_id = UserId::new(entry.id).ok_or_else(|| invalid("bad id"))?;
            let email = Email::new(&entry.email).map_err(|e| invalid(&e.to_string()))?;
            let password_hash = HashedPassword::from_phc_string(entry.password_hash)
                .map_err(|e| invalid(&e.to_string()))?;

            if profiles.contains_key(&user_id) || by_email.contains_key(&email) {
                return Err(invalid("duplicate id or email"));
            }

            profiles.insert(
                user_id.clone(),
                UserProfile {
                    user_id: user_id.clone(),
                    role: entry.role,
                },
            );
            by_email.insert(
                email,
                Account {
                    user_id,
                    password_hash,
                },
            );
        }

        Ok(Self {
            by_email: Arc::new(by_email),
            profiles: Arc::new(profiles),
        })
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

impl CredentialVerifier for StaticIdentityProvider {
    async fn verify_credentials(
        &self,
        email: &Email,
        password: &ClearTextPassword,
    ) -> Result<UserId, IdentityError> {
        let provider = self.clone();
        let email = email.clone();
        let password = ClearTextPassword::new(password.expose().to_string())
            .map_err(|_| IdentityError::Rejected)?;

        // Argon2 is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || match provider.by_email.get(&email) {
            Some(account) if account.password_hash.verify(&password, None) => {
                Ok(account.user_id.clone())
            }
            Some(_) => Err(IdentityError::Rejected),
            None => {
                verify_dummy(&password);
                Err(IdentityError::Rejected)
            }
        })
        .await
        .map_err(|e| IdentityError::Unavailable(format!("verifier task failed: {e}")))?
    }
}

impl ProfileStore for StaticIdentityProvider {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, IdentityError> {
        Ok(self.profiles.get(user_id).cloned())
    }
}
