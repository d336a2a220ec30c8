//! In-Memory Session Repository
//!
//! Process-local session map. State is lost on restart.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::entity::session_record::SessionRecord;
use crate::domain::repository::{SessionError, SessionRepository};
use crate::domain::value_object::{session_id::SessionId, user_id::UserId};

/// DashMap-backed session repository
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct MemorySessionRepository {
    sessions: Arc<DashMap<SessionId, SessionRecord>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for MemorySessionRepository {
    async fn insert(&self, id: SessionId, record: SessionRecord) -> Result<(), SessionError> {
        self.sessions.insert(id, record);
        Ok(())
    }

    async fn touch(
        &self,
        id: &SessionId,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, SessionError> {
        match self.sessions.entry(id.clone()) {
            Entry::Vacant(_) => Err(SessionError::NotFound),
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired_at(now.timestamp_millis()) {
                    entry.remove();
                    return Err(SessionError::Expired);
                }
                if entry.get().user_id != *owner {
                    return Err(SessionError::OwnerMismatch);
                }
                entry.get_mut().touch(now);
                Ok(entry.get().clone())
            }
        }
    }

    async fn extend(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<SessionRecord, SessionError> {
        match self.sessions.entry(id.clone()) {
            Entry::Vacant(_) => Err(SessionError::NotFound),
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired_at(now.timestamp_millis()) {
                    entry.remove();
                    return Err(SessionError::Expired);
                }
                entry.get_mut().extend(now, ttl);
                Ok(entry.get().clone())
            }
        }
    }

    async fn remove(&self, id: &SessionId) -> Result<bool, SessionError> {
        Ok(self.sessions.remove(id).is_some())
    }

    async fn sweep(&self, now_ms: i64) -> Result<usize, SessionError> {
        // Snapshot first so no shard stays locked for the whole pass
        let candidates: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().expires_at_ms < now_ms)
            .map(|entry| entry.key().clone())
            .collect();

        // Re-check per key: a session extended since the snapshot survives
        let removed = candidates
            .iter()
            .filter(|id| {
                self.sessions
                    .remove_if(*id, |_, record| record.expires_at_ms < now_ms)
                    .is_some()
            })
            .count();

        Ok(removed)
    }

    async fn count(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{email::Email, user_role::UserRole};

    fn owner() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn record(now: DateTime<Utc>, ttl: Duration) -> SessionRecord {
        SessionRecord::new(
            owner(),
            Email::new("inspector@example.com").unwrap(),
            UserRole::User,
            now,
            ttl,
        )
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let repo = MemorySessionRepository::new();
        let other = repo.clone();
        let id = SessionId::generate();

        repo.insert(id.clone(), record(Utc::now(), Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(other.count().await.unwrap(), 1);
        assert!(other.remove(&id).await.unwrap());
        assert!(!repo.remove(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_skips_entries_extended_after_snapshot() {
        let repo = MemorySessionRepository::new();
        let now = Utc::now();
        let id = SessionId::generate();
        repo.insert(id.clone(), record(now, Duration::seconds(1)))
            .await
            .unwrap();

        let later = now + Duration::seconds(10);
        // Simulate a concurrent refresh landing between snapshot and removal
        repo.sessions
            .get_mut(&id)
            .unwrap()
            .extend(later, Duration::hours(1));

        assert_eq!(repo.sweep(later.timestamp_millis()).await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_touch_by_other_owner_leaves_activity_alone() {
        let repo = MemorySessionRepository::new();
        let now = Utc::now();
        let id = SessionId::generate();
        repo.insert(id.clone(), record(now, Duration::hours(1)))
            .await
            .unwrap();

        let later = now + Duration::minutes(10);
        let stranger = UserId::new("user-2").unwrap();
        assert_eq!(
            repo.touch(&id, &stranger, later).await.unwrap_err(),
            SessionError::OwnerMismatch
        );
        assert_eq!(repo.sessions.get(&id).unwrap().last_activity_at, now);

        let touched = repo.touch(&id, &owner(), later).await.unwrap();
        assert_eq!(touched.last_activity_at, later);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_touch_and_expiry() {
        let repo = MemorySessionRepository::new();
        let now = Utc::now();
        let id = SessionId::generate();
        repo.insert(id.clone(), record(now, Duration::seconds(5)))
            .await
            .unwrap();

        let at_expiry = now + Duration::seconds(5);
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                let id = id.clone();
                let owner = owner();
                tokio::spawn(async move { repo.touch(&id, &owner, at_expiry).await })
            })
            .collect();

        let mut expired = 0;
        let mut not_found = 0;
        for task in tasks {
            match task.await.unwrap() {
                Err(SessionError::Expired) => expired += 1,
                Err(SessionError::NotFound) => not_found += 1,
                other => panic!("expired session revived: {other:?}"),
            }
        }

        // Exactly one caller observes and evicts the expired entry
        assert_eq!(expired, 1);
        assert_eq!(not_found, 15);
    }
}
