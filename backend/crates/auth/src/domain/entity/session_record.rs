//! Session Record Entity
//!
//! Server-side state of one authenticated session. Only the session store
//! creates and mutates records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_object::{email::Email, user_id::UserId, user_role::UserRole};

/// Session record entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: UserId,
    pub email: Email,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    /// Updated on every successful verify; never moves `expires_at_ms`
    pub last_activity_at: DateTime<Utc>,
    /// Session expiration (Unix timestamp ms)
    pub expires_at_ms: i64,
}

impl SessionRecord {
    /// Create a record that lives for `ttl` from `now`
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn new(
        user_id: UserId,
        email: Email,
        role: UserRole,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            user_id,
            email,
            role,
            created_at: now,
            last_activity_at: now,
            expires_at_ms: (now + ttl).timestamp_millis(),
        }
    }

    /// Expired at or after `expires_at_ms`
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Sliding touch: record activity without extending the lifetime
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Push the expiry out to `now + ttl`
    pub fn extend(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.last_activity_at = now;
        self.expires_at_ms = (now + ttl).timestamp_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(now: DateTime<Utc>) -> SessionRecord {
        SessionRecord::new(
            UserId::new("u-1").unwrap(),
            Email::new("inspector@example.com").unwrap(),
            UserRole::User,
            now,
            Duration::days(7),
        )
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let rec = record(now);
        let expires = rec.expires_at_ms;

        assert!(!rec.is_expired_at(expires - 1));
        assert!(rec.is_expired_at(expires));
        assert!(rec.is_expired_at(expires + 5));
    }

    #[test]
    fn test_touch_does_not_extend() {
        let now = Utc::now();
        let mut rec = record(now);
        let expires = rec.expires_at_ms;

        let later = now + Duration::hours(3);
        rec.touch(later);
        assert_eq!(rec.last_activity_at, later);
        assert_eq!(rec.expires_at_ms, expires);
    }

    #[test]
    fn test_extend_moves_expiry() {
        let now = Utc::now();
        let mut rec = record(now);

        let later = now + Duration::days(2);
        rec.extend(later, Duration::days(7));
        assert_eq!(rec.expires_at_ms, (later + Duration::days(7)).timestamp_millis());
        assert_eq!(rec.created_at, now);
    }
}
