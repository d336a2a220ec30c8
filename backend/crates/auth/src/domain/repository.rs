//! Repository Traits
//!
//! Interfaces for session state. Implementations are in the infrastructure
//! layer; the in-memory one is the default, a shared cache can stand in for
//! multi-instance deployments.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::domain::entity::session_record::SessionRecord;
use crate::domain::value_object::{session_id::SessionId, user_id::UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,

    #[error("Session belongs to another user")]
    OwnerMismatch,

    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Session repository trait
///
/// `touch` and `extend` are single atomic steps per key: lookup, expiry
/// check, eviction and mutation cannot interleave with another caller.
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    /// Store a new session
    async fn insert(&self, id: SessionId, record: SessionRecord) -> Result<(), SessionError>;

    /// Verify and record activity. An expired entry is evicted and reported
    /// as [`SessionError::Expired`]; a session owned by someone other than
    /// `owner` is left untouched and reported as
    /// [`SessionError::OwnerMismatch`].
    async fn touch(
        &self,
        id: &SessionId,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, SessionError>;

    /// Reset the expiry of a live session to `now + ttl`
    async fn extend(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<SessionRecord, SessionError>;

    /// Delete a session; returns whether one existed
    async fn remove(&self, id: &SessionId) -> Result<bool, SessionError>;

    /// Delete every session expired at `now_ms`
    async fn sweep(&self, now_ms: i64) -> Result<usize, SessionError>;

    /// Number of stored sessions
    async fn count(&self) -> Result<usize, SessionError>;
}
