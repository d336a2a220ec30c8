//! Identity Provider Traits
//!
//! Credential verification and profile lookup are delegated to an external
//! identity provider.

use platform::password::ClearTextPassword;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_object::{email::Email, user_id::UserId, user_role::UserRole};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Unknown account or wrong password; deliberately indistinguishable
    #[error("Credentials rejected")]
    Rejected,

    /// Transport failure, timeout or unexpected provider response
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Profile attached to an authenticated account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub role: UserRole,
}

/// Checks an email/password pair
#[trait_variant::make(CredentialVerifier: Send)]
pub trait LocalCredentialVerifier {
    async fn verify_credentials(
        &self,
        email: &Email,
        password: &ClearTextPassword,
    ) -> Result<UserId, IdentityError>;
}

/// Resolves the role/profile of an account
#[trait_variant::make(ProfileStore: Send)]
pub trait LocalProfileStore {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, IdentityError>;
}
