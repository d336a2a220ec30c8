//! Hosted Identity Provider
//!
//! Delegates the password grant and the profile lookup to a hosted auth
//! backend over HTTPS.

use std::time::Duration;

use platform::password::ClearTextPassword;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::domain::identity::{CredentialVerifier, IdentityError, ProfileStore, UserProfile};
use crate::domain::value_object::{email::Email, user_id::UserId, user_role::UserRole};

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct GrantResponse {
    user: GrantUser,
}

#[derive(Deserialize)]
struct GrantUser {
    id: String,
}

#[derive(Deserialize)]
struct ProfileRow {
    role: String,
}

#[derive(Clone)]
pub struct RemoteIdentityProvider {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl RemoteIdentityProvider {
    /// `timeout` bounds each request at the transport level
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }
}

fn unavailable(err: reqwest::Error) -> IdentityError {
    IdentityError::Unavailable(err.to_string())
}

impl CredentialVerifier for RemoteIdentityProvider {
    async fn verify_credentials(
        &self,
        email: &Email,
        password: &ClearTextPassword,
    ) -> Result<UserId, IdentityError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&PasswordGrant {
                email: email.as_str(),
                password: password.expose(),
            })
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => {
                let grant: GrantResponse = response.json().await.map_err(unavailable)?;
                UserId::new(grant.user.id).ok_or_else(|| {
                    IdentityError::Unavailable("provider returned an invalid user id".to_string())
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(IdentityError::Rejected)
            }
            status => Err(IdentityError::Unavailable(format!(
                "password grant returned {status}"
            ))),
        }
    }
}

impl ProfileStore for RemoteIdentityProvider {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, IdentityError> {
        let url = format!("{}/rest/v1/profiles", self.base_url);
        let id_filter = format!("eq.{}", user_id);
        let response = self
            .http
            .get(&url)
            .query(&[("id", id_filter.as_str()), ("select", "role")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(IdentityError::Unavailable(format!(
                "profile lookup returned {}",
                response.status()
            )));
        }

        let rows: Vec<ProfileRow> = response.json().await.map_err(unavailable)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        match UserRole::from_code(&row.role) {
            Some(role) => Ok(Some(UserProfile {
                user_id: user_id.clone(),
                role,
            })),
            None => {
                tracing::warn!(user_id = %user_id, role = %row.role, "Profile has an unknown role");
                Ok(None)
            }
        }
    }
}
