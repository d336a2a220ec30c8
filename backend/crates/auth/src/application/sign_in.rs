//! Sign In Use Case
//!
//! Rate-limits, authenticates and issues a CSRF token for a login attempt.

use std::sync::Arc;

use platform::password::ClearTextPassword;
use platform::rate_limit::RateLimitStore;

use crate::application::authenticator::{AuthenticatedUser, HybridAuthenticator};
use crate::application::csrf::CsrfGuard;
use crate::application::rate_limiter::RateLimiter;
use crate::domain::identity::{CredentialVerifier, ProfileStore};
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::{email::Email, session_id::SessionId};
use crate::error::AuthResult;

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
    /// Rate-limit key of the caller, usually its IP
    pub client_key: String,
}

/// Sign in output
#[derive(Debug)]
pub struct SignInOutput {
    pub session_id: SessionId,
    pub jwt: String,
    pub user: AuthenticatedUser,
    pub csrf_token: String,
}

/// Sign in use case
pub struct SignInUseCase<I, S, L>
where
    I: CredentialVerifier + ProfileStore,
    S: SessionRepository,
    L: RateLimitStore,
{
    authenticator: Arc<HybridAuthenticator<I, S>>,
    limiter: Arc<RateLimiter<L>>,
    csrf: Arc<CsrfGuard>,
}

impl<I, S, L> SignInUseCase<I, S, L>
where
    I: CredentialVerifier + ProfileStore,
    S: SessionRepository,
    L: RateLimitStore,
{
    pub fn new(
        authenticator: Arc<HybridAuthenticator<I, S>>,
        limiter: Arc<RateLimiter<L>>,
        csrf: Arc<CsrfGuard>,
    ) -> Self {
        Self {
            authenticator,
            limiter,
            csrf,
        }
    }

    pub async fn execute(&self, input: SignInInput) -> AuthResult<SignInOutput> {
        // Counting uses the normalized form so case variants share one bucket
        let identifier = input.email.trim().to_lowercase();
        let identifier = (!identifier.is_empty()).then_some(identifier.as_str());

        // Counted before the credential check and never rolled back
        self.limiter.hit(&input.client_key, identifier).await?;

        let email = Email::new(&input.email)?;
        let password = ClearTextPassword::new(input.password)?;

        let outcome = self.authenticator.authenticate(&email, &password).await?;

        self.limiter.reset_identifier(email.as_str()).await?;

        Ok(SignInOutput {
            session_id: outcome.session_id,
            jwt: outcome.jwt,
            user: outcome.user,
            csrf_token: self.csrf.generate(),
        })
    }
}
