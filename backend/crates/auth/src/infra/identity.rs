//! Identity Backend Selection
//!
//! Picks the credential verifier and profile store from the environment.

use std::time::Duration;

use platform::password::ClearTextPassword;
use thiserror::Error;

use super::remote_identity::RemoteIdentityProvider;
use super::static_identity::{StaticIdentityError, StaticIdentityProvider};
use crate::domain::identity::{CredentialVerifier, IdentityError, ProfileStore, UserProfile};
use crate::domain::value_object::{email::Email, user_id::UserId};

#[derive(Debug, Error)]
pub enum IdentityConfigError {
    #[error("No identity provider configured: set AUTH_USERS_FILE or IDENTITY_URL")]
    NotConfigured,

    #[error("IDENTITY_API_KEY is required when IDENTITY_URL is set")]
    MissingApiKey,

    #[error(transparent)]
    Static(#[from] StaticIdentityError),

    #[error("Failed to build identity client: {0}")]
    Remote(IdentityError),
}

/// Configured identity provider
#[derive(Clone)]
pub enum IdentityBackend {
    Static(StaticIdentityProvider),
    Remote(RemoteIdentityProvider),
}

impl IdentityBackend {
    pub fn from_env(timeout: Duration) -> Result<Self, IdentityConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), timeout)
    }

    /// `AUTH_USERS_FILE` wins over `IDENTITY_URL` when both are set
    pub fn from_lookup<F>(lookup: F, timeout: Duration) -> Result<Self, IdentityConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty("AUTH_USERS_FILE") {
            let provider = StaticIdentityProvider::from_file(&path)?;
            tracing::info!(path = %path, users = provider.len(), "Loaded static identity provider");
            return Ok(Self::Static(provider));
        }

        if let Some(url) = non_empty("IDENTITY_URL") {
            let api_key = non_empty("IDENTITY_API_KEY").ok_or(IdentityConfigError::MissingApiKey)?;
            let provider = RemoteIdentityProvider::new(&url, api_key, timeout)
                .map_err(IdentityConfigError::Remote)?;
            tracing::info!(url = %url, "Using remote identity provider");
            return Ok(Self::Remote(provider));
        }

        Err(IdentityConfigError::NotConfigured)
    }
}

impl CredentialVerifier for IdentityBackend {
    async fn verify_credentials(
        &self,
        email: &Email,
        password: &ClearTextPassword,
    ) -> Result<UserId, IdentityError> {
        match self {
            Self::Static(provider) => provider.verify_credentials(email, password).await,
            Self::Remote(provider) => provider.verify_credentials(email, password).await,
        }
    }
}

impl ProfileStore for IdentityBackend {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, IdentityError> {
        match self {
            Self::Static(provider) => provider.find_profile(user_id).await,
            Self::Remote(provider) => provider.find_profile(user_id).await,
        }
    }
}
