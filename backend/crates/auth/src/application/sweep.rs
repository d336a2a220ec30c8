//! Background Sweeps
//!
//! Periodic removal of expired sessions and elapsed rate-limit entries.

use std::sync::Arc;

use platform::rate_limit::RateLimitStore;
use platform::sweeper::{SweeperHandle, spawn_sweeper};

use crate::application::authenticator::HybridAuthenticator;
use crate::application::config::AuthConfig;
use crate::application::rate_limiter::RateLimiter;
use crate::domain::identity::{CredentialVerifier, ProfileStore};
use crate::domain::repository::SessionRepository;

/// Handles of the running auth sweepers
pub struct AuthSweepers {
    sessions: SweeperHandle,
    rate_limits: SweeperHandle,
}

impl AuthSweepers {
    pub fn spawn<I, S, L>(
        authenticator: Arc<HybridAuthenticator<I, S>>,
        limiter: Arc<RateLimiter<L>>,
        config: &AuthConfig,
    ) -> Self
    where
        I: CredentialVerifier + ProfileStore + Send + Sync + 'static,
        S: SessionRepository + Send + Sync + 'static,
        L: RateLimitStore + Send + Sync + 'static,
    {
        let sessions = spawn_sweeper("sessions", config.session_sweep_interval, move || {
            let authenticator = authenticator.clone();
            async move { authenticator.sessions().sweep().await }
        });

        let rate_limits = spawn_sweeper("rate_limits", config.rate_limit_sweep_interval, move || {
            let limiter = limiter.clone();
            async move { limiter.sweep().await }
        });

        tracing::info!(
            session_interval_secs = config.session_sweep_interval.as_secs(),
            rate_limit_interval_secs = config.rate_limit_sweep_interval.as_secs(),
            "Auth sweepers started"
        );

        Self {
            sessions,
            rate_limits,
        }
    }

    /// Stop both sweepers and wait for them to exit
    pub async fn shutdown(self) {
        tokio::join!(self.sessions.shutdown(), self.rate_limits.shutdown());
        tracing::info!("Auth sweepers stopped");
    }
}
