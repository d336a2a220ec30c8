//! Rate Limiting Infrastructure
//!
//! Sliding-window attempt counters with temporary blocking. A window opens on
//! the first attempt and resets relative to it, not to clock boundaries.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;

/// Rate limit policy for one family of keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Attempts allowed inside one window; reaching it blocks the key
    pub max_attempts: u32,
    /// Window length, measured from the first attempt
    pub window: Duration,
    /// How long a key stays blocked once the limit is reached
    pub block_duration: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_attempts: u32, window: Duration, block_duration: Duration) -> Self {
        Self {
            max_attempts,
            window,
            block_duration,
        }
    }

    /// 20 attempts per 15 minutes, 1 hour block
    pub fn per_ip() -> Self {
        Self::new(20, Duration::from_secs(15 * 60), Duration::from_secs(60 * 60))
    }

    /// 5 attempts per 15 minutes, 30 minute block
    pub fn per_identifier() -> Self {
        Self::new(5, Duration::from_secs(15 * 60), Duration::from_secs(30 * 60))
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    pub fn block_ms(&self) -> i64 {
        self.block_duration.as_millis() as i64
    }
}

/// Counter state for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub first_attempt_ms: i64,
    pub blocked_until_ms: Option<i64>,
}

impl RateLimitEntry {
    fn first(now_ms: i64) -> Self {
        Self {
            count: 1,
            first_attempt_ms: now_ms,
            blocked_until_ms: None,
        }
    }

    pub fn is_blocked_at(&self, now_ms: i64) -> bool {
        self.blocked_until_ms.is_some_and(|until| now_ms < until)
    }

    /// Seconds until the block lifts, rounded up; `None` when not blocked
    pub fn retry_after_secs(&self, now_ms: i64) -> Option<u64> {
        let until = self.blocked_until_ms.filter(|until| now_ms < *until)?;
        Some(((until - now_ms) as u64).div_ceil(1000))
    }

    /// Entry for the first attempt of a fresh window
    fn opening(policy: &RateLimitPolicy, now_ms: i64) -> Self {
        let mut entry = Self::first(now_ms);
        entry.block_if_exhausted(policy, now_ms);
        entry
    }

    /// Count one attempt from an unblocked state under `policy`
    fn count_attempt(&mut self, policy: &RateLimitPolicy, now_ms: i64) {
        let block_lapsed = self.blocked_until_ms.is_some();
        if block_lapsed || now_ms - self.first_attempt_ms >= policy.window_ms() {
            *self = Self::first(now_ms);
        } else {
            self.count = self.count.saturating_add(1);
        }
        self.block_if_exhausted(policy, now_ms);
    }

    fn block_if_exhausted(&mut self, policy: &RateLimitPolicy, now_ms: i64) {
        if self.count >= policy.max_attempts {
            self.blocked_until_ms = Some(now_ms + policy.block_ms());
        }
    }

    /// Both the window and any block have fully elapsed
    pub fn is_stale_at(&self, policy: &RateLimitPolicy, now_ms: i64) -> bool {
        !self.is_blocked_at(now_ms) && now_ms - self.first_attempt_ms >= policy.window_ms()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("Rate limited, retry after {retry_after_secs}s")]
    Limited { retry_after_secs: u64 },

    #[error("Rate limit backend error: {0}")]
    Backend(String),
}

/// Trait for rate limit storage backends
///
/// `hit` is the only mutating call on the request path and must run as one
/// atomic step per key: the block check and the increment cannot be split
/// across two round trips.
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Seconds until `key` is unblocked, `None` if it may proceed.
    /// Read-only.
    async fn retry_after(&self, key: &str, now_ms: i64) -> Result<Option<u64>, RateLimitError>;

    /// Refuse with [`RateLimitError::Limited`] while `key` is blocked,
    /// otherwise count one attempt and return the updated entry. A refused
    /// attempt is not counted.
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
        now_ms: i64,
    ) -> Result<RateLimitEntry, RateLimitError>;

    /// Forget `key` entirely
    async fn reset(&self, key: &str) -> Result<(), RateLimitError>;

    /// Drop stale entries, returning how many were removed
    async fn sweep(&self, policy: &RateLimitPolicy, now_ms: i64) -> Result<usize, RateLimitError>;
}

/// Process-local store backed by a sharded concurrent map
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|entry| *entry)
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    async fn retry_after(&self, key: &str, now_ms: i64) -> Result<Option<u64>, RateLimitError> {
        Ok(self
            .get(key)
            .and_then(|entry| entry.retry_after_secs(now_ms)))
    }

    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
        now_ms: i64,
    ) -> Result<RateLimitEntry, RateLimitError> {
        // The shard lock is held from lookup to write
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if let Some(retry_after_secs) = entry.retry_after_secs(now_ms) {
                    return Err(RateLimitError::Limited { retry_after_secs });
                }
                entry.count_attempt(policy, now_ms);
                Ok(*entry)
            }
            Entry::Vacant(vacant) => {
                let entry = RateLimitEntry::opening(policy, now_ms);
                vacant.insert(entry);
                Ok(entry)
            }
        }
    }

    async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn sweep(&self, policy: &RateLimitPolicy, now_ms: i64) -> Result<usize, RateLimitError> {
        let candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.value().is_stale_at(policy, now_ms))
            .map(|e| e.key().clone())
            .collect();

        let removed = candidates
            .iter()
            .filter(|key| {
                self.entries
                    .remove_if(key.as_str(), |_, e| e.is_stale_at(policy, now_ms))
                    .is_some()
            })
            .count();
        Ok(removed)
    }
}
