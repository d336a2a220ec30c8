//! Session Store
//!
//! Creates, verifies, extends and destroys server-side sessions on top of a
//! [`SessionRepository`]. Time comes from the injected clock.

use std::time::Duration;

use platform::clock::{Clock, SharedClock};

use crate::domain::entity::session_record::SessionRecord;
use crate::domain::repository::{SessionError, SessionRepository};
use crate::domain::value_object::{
    email::Email, session_id::SessionId, user_id::UserId, user_role::UserRole,
};

pub struct SessionStore<S>
where
    S: SessionRepository,
{
    repo: S,
    ttl: chrono::Duration,
    clock: SharedClock,
}

impl<S> SessionStore<S>
where
    S: SessionRepository,
{
    pub fn new(repo: S, ttl: Duration, clock: SharedClock) -> Self {
        Self {
            repo,
            // Out-of-range TTLs fail closed: sessions expire immediately
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero()),
            clock,
        }
    }

    /// Open a session that lives for the configured TTL
    pub async fn create(
        &self,
        user_id: &UserId,
        email: &Email,
        role: UserRole,
    ) -> Result<(SessionId, SessionRecord), SessionError> {
        let id = SessionId::generate();
        let record = SessionRecord::new(
            user_id.clone(),
            email.clone(),
            role,
            self.clock.now(),
            self.ttl,
        );

        self.repo.insert(id.clone(), record.clone()).await?;
        tracing::debug!(session = %id, user_id = %user_id, "Session created");
        Ok((id, record))
    }

    /// Look up a live session owned by `owner` and record activity
    pub async fn verify(
        &self,
        id: &SessionId,
        owner: &UserId,
    ) -> Result<SessionRecord, SessionError> {
        let result = self.repo.touch(id, owner, self.clock.now()).await;
        if let Err(SessionError::Expired) = result {
            tracing::debug!(session = %id, "Expired session evicted on access");
        }
        result
    }

    /// Restart the TTL of a live session
    pub async fn extend(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        self.repo.extend(id, self.clock.now(), self.ttl).await
    }

    /// Remove a session; unknown ids are fine
    pub async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        if self.repo.remove(id).await? {
            tracing::debug!(session = %id, "Session destroyed");
        }
        Ok(())
    }

    /// Remove every session expired by now
    pub async fn sweep(&self) -> Result<usize, SessionError> {
        self.repo.sweep(self.clock.now_ms()).await
    }

    pub async fn count(&self) -> Result<usize, SessionError> {
        self.repo.count().await
    }
}
