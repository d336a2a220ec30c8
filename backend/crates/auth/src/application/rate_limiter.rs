//! Login Rate Limiter
//!
//! Two independent sliding-window counters: one per client IP and one per
//! login identifier. Only the identifier counter is cleared on success; the
//! IP counter keeps running so one address cannot cycle through accounts.

use platform::clock::{Clock, SharedClock};
use platform::rate_limit::{RateLimitError, RateLimitPolicy, RateLimitStore};

pub struct RateLimiter<L>
where
    L: RateLimitStore,
{
    by_ip: L,
    by_identifier: L,
    ip_policy: RateLimitPolicy,
    identifier_policy: RateLimitPolicy,
    clock: SharedClock,
}

impl<L> RateLimiter<L>
where
    L: RateLimitStore,
{
    pub fn new(
        by_ip: L,
        by_identifier: L,
        ip_policy: RateLimitPolicy,
        identifier_policy: RateLimitPolicy,
        clock: SharedClock,
    ) -> Self {
        Self {
            by_ip,
            by_identifier,
            ip_policy,
            identifier_policy,
            clock,
        }
    }

    /// Admit one attempt and count it against both keys, or fail with
    /// [`RateLimitError::Limited`] if either key is blocked. The longer wait
    /// is reported and a refused attempt is not counted.
    pub async fn hit(&self, ip: &str, identifier: Option<&str>) -> Result<(), RateLimitError> {
        let now_ms = self.clock.now_ms();

        let ip_wait = self.by_ip.retry_after(ip, now_ms).await?;
        let identifier_wait = match identifier {
            Some(id) => self.by_identifier.retry_after(id, now_ms).await?,
            None => None,
        };
        if let Some(retry_after_secs) = ip_wait.max(identifier_wait) {
            return Err(RateLimitError::Limited { retry_after_secs });
        }

        // Each store re-checks the block inside its own atomic hit
        let entry = self.by_ip.hit(ip, &self.ip_policy, now_ms).await?;
        if entry.count == self.ip_policy.max_attempts {
            tracing::warn!(ip = %ip, "Client IP blocked after too many login attempts");
        }

        if let Some(id) = identifier {
            let entry = self
                .by_identifier
                .hit(id, &self.identifier_policy, now_ms)
                .await?;
            if entry.count == self.identifier_policy.max_attempts {
                tracing::warn!("Login identifier blocked after too many attempts");
            }
        }

        Ok(())
    }

    /// Clear the identifier counter after a successful login
    pub async fn reset_identifier(&self, identifier: &str) -> Result<(), RateLimitError> {
        self.by_identifier.reset(identifier).await
    }

    /// Drop fully elapsed entries from both maps
    pub async fn sweep(&self) -> Result<usize, RateLimitError> {
        let now_ms = self.clock.now_ms();
        let ip = self.by_ip.sweep(&self.ip_policy, now_ms).await?;
        let identifier = self
            .by_identifier
            .sweep(&self.identifier_policy, now_ms)
            .await?;
        Ok(ip + identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::clock::ManualClock;
    use platform::rate_limit::MemoryRateLimitStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn limiter() -> (RateLimiter<MemoryRateLimitStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let limiter = RateLimiter::new(
            MemoryRateLimitStore::new(),
            MemoryRateLimitStore::new(),
            RateLimitPolicy::per_ip(),
            RateLimitPolicy::per_identifier(),
            clock.clone(),
        );
        (limiter, clock)
    }

    fn limited(secs: u64) -> RateLimitError {
        RateLimitError::Limited {
            retry_after_secs: secs,
        }
    }

    #[tokio::test]
    async fn test_identifier_blocks_after_max_attempts() {
        let (limiter, _) = limiter();
        let email = Some("a@example.com");

        for _ in 0..5 {
            limiter.hit("10.0.0.1", email).await.unwrap();
        }

        assert_eq!(
            limiter.hit("10.0.0.1", email).await.unwrap_err(),
            limited(1800)
        );
        // Same IP, another identifier: IP counter is at 5 of 20
        assert!(limiter.hit("10.0.0.1", Some("b@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_block_lifts_after_block_duration() {
        let (limiter, clock) = limiter();
        let email = Some("a@example.com");
        for _ in 0..5 {
            limiter.hit("10.0.0.1", email).await.unwrap();
        }

        clock.advance(Duration::from_secs(30 * 60 - 1));
        assert_eq!(limiter.hit("10.0.0.1", email).await.unwrap_err(), limited(1));

        clock.advance(Duration::from_secs(1));
        assert!(limiter.hit("10.0.0.1", email).await.is_ok());
    }

    #[tokio::test]
    async fn test_refused_attempt_counts_against_neither_key() {
        let (limiter, _) = limiter();
        let email = Some("a@example.com");
        for _ in 0..5 {
            limiter.hit("10.0.0.1", email).await.unwrap();
        }
        for _ in 0..30 {
            assert!(limiter.hit("10.0.0.1", email).await.is_err());
        }

        // 5 of 20 used on the IP: fifteen more identifiers still fit
        for i in 0..15 {
            let other = format!("user{i}@example.com");
            limiter.hit("10.0.0.1", Some(&other)).await.unwrap();
        }
        assert_eq!(
            limiter.hit("10.0.0.1", Some("late@example.com")).await.unwrap_err(),
            limited(3600)
        );
    }

    #[tokio::test]
    async fn test_reset_identifier_keeps_ip_counter() {
        let (limiter, _) = limiter();
        let email = Some("a@example.com");

        for _ in 0..5 {
            limiter.hit("10.0.0.1", email).await.unwrap();
        }
        limiter.reset_identifier("a@example.com").await.unwrap();
        limiter.hit("10.0.0.1", email).await.unwrap();

        for i in 0..14 {
            let other = format!("user{i}@example.com");
            limiter.hit("10.0.0.1", Some(&other)).await.unwrap();
        }
        assert_eq!(
            limiter.hit("10.0.0.1", email).await.unwrap_err(),
            limited(3600)
        );
    }

    #[tokio::test]
    async fn test_larger_retry_after_wins() {
        let (limiter, clock) = limiter();
        let email = Some("a@example.com");

        for _ in 0..5 {
            limiter.hit("10.0.0.8", email).await.unwrap();
        }
        clock.advance(Duration::from_secs(60));
        for i in 0..20 {
            let other = format!("user{i}@example.com");
            limiter.hit("10.0.0.9", Some(&other)).await.unwrap();
        }

        // Identifier blocked for 29 more minutes, IP 10.0.0.9 for 60
        assert_eq!(
            limiter.hit("10.0.0.9", email).await.unwrap_err(),
            limited(3600)
        );
        // Identifier alone
        assert_eq!(
            limiter.hit("10.0.0.1", email).await.unwrap_err(),
            limited(29 * 60)
        );
    }

    #[tokio::test]
    async fn test_sweep_counts_both_maps() {
        let (limiter, clock) = limiter();
        limiter.hit("10.0.0.1", Some("a@example.com")).await.unwrap();

        assert_eq!(limiter.sweep().await.unwrap(), 0);
        clock.advance(Duration::from_secs(15 * 60));
        assert_eq!(limiter.sweep().await.unwrap(), 2);
    }
}
