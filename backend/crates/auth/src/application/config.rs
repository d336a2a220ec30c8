//! Application Configuration
//!
//! Configuration for the Auth application layer. Signing secrets have no
//! default: loading fails when either one is missing or too short.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::rate_limit::RateLimitPolicy;
use thiserror::Error;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

pub const SESSION_COOKIE_NAME: &str = "session_id";
pub const CSRF_COOKIE_NAME: &str = "csrf_token";
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";
pub const CSRF_BODY_FIELD: &str = "csrf_token";

const DAY_SECS: u64 = 24 * 3600;

/// Upper bound for every configured duration (10 years)
const MAX_DURATION_SECS: u64 = 3650 * DAY_SECS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is not set; refusing to start without a signing secret")]
    MissingSecret(&'static str),

    #[error("{name} must be at least {min} bytes")]
    SecretTooShort { name: &'static str, min: usize },

    #[error("{name} has an invalid value: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 key for JWTs
    pub jwt_secret: Vec<u8>,
    /// HMAC key for CSRF tokens
    pub csrf_secret: Vec<u8>,
    pub jwt_ttl: Duration,
    pub session_ttl: Duration,
    pub csrf_ttl: Duration,
    /// Whether to set the Secure cookie attribute
    pub cookie_secure: bool,
    /// Upper bound on one credential check against the identity provider
    pub identity_timeout: Duration,
    pub session_sweep_interval: Duration,
    pub rate_limit_sweep_interval: Duration,
    pub ip_policy: RateLimitPolicy,
    pub identifier_policy: RateLimitPolicy,
    /// Reverse proxies whose `X-Forwarded-For` is believed
    pub trusted_proxies: Vec<IpAddr>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("csrf_secret", &"[REDACTED]")
            .field("jwt_ttl", &self.jwt_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("csrf_ttl", &self.csrf_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("identity_timeout", &self.identity_timeout)
            .field("session_sweep_interval", &self.session_sweep_interval)
            .field("rate_limit_sweep_interval", &self.rate_limit_sweep_interval)
            .field("ip_policy", &self.ip_policy)
            .field("identifier_policy", &self.identifier_policy)
            .field("trusted_proxies", &self.trusted_proxies)
            .finish()
    }
}

impl AuthConfig {
    /// Load from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |name: &'static str| -> Result<Vec<u8>, ConfigError> {
            let value = lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingSecret(name))?;
            if value.len() < MIN_SECRET_LEN {
                return Err(ConfigError::SecretTooShort {
                    name,
                    min: MIN_SECRET_LEN,
                });
            }
            Ok(value.into_bytes())
        };

        let secs = |name: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match lookup(name) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(n) if n > 0 && n <= MAX_DURATION_SECS => Ok(Duration::from_secs(n)),
                    _ => Err(ConfigError::InvalidValue { name, value: raw }),
                },
            }
        };

        let cookie_secure = match lookup("COOKIE_SECURE") {
            None => true,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "COOKIE_SECURE",
                        value: raw,
                    });
                }
            },
        };

        let trusted_proxies = match lookup("TRUSTED_PROXIES") {
            None => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<IpAddr>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "TRUSTED_PROXIES",
                    value: raw.clone(),
                })?,
        };

        Ok(Self {
            jwt_secret: secret("JWT_SECRET")?,
            csrf_secret: secret("CSRF_SECRET")?,
            jwt_ttl: secs("JWT_TTL_SECS", 7 * DAY_SECS)?,
            session_ttl: secs("SESSION_TTL_SECS", 7 * DAY_SECS)?,
            csrf_ttl: secs("CSRF_TTL_SECS", DAY_SECS)?,
            cookie_secure,
            identity_timeout: secs("IDENTITY_TIMEOUT_SECS", 5)?,
            session_sweep_interval: secs("SESSION_SWEEP_INTERVAL_SECS", 3600)?,
            rate_limit_sweep_interval: secs("RATE_LIMIT_SWEEP_INTERVAL_SECS", 300)?,
            ip_policy: RateLimitPolicy::per_ip(),
            identifier_policy: RateLimitPolicy::per_identifier(),
            trusted_proxies,
        })
    }

    /// Config for development and tests: random secrets, insecure cookies
    pub fn development() -> Self {
        Self {
            jwt_secret: platform::crypto::random_bytes(MIN_SECRET_LEN),
            csrf_secret: platform::crypto::random_bytes(MIN_SECRET_LEN),
            jwt_ttl: Duration::from_secs(7 * DAY_SECS),
            session_ttl: Duration::from_secs(7 * DAY_SECS),
            csrf_ttl: Duration::from_secs(DAY_SECS),
            cookie_secure: false,
            identity_timeout: Duration::from_secs(5),
            session_sweep_interval: Duration::from_secs(3600),
            rate_limit_sweep_interval: Duration::from_secs(300),
            ip_policy: RateLimitPolicy::per_ip(),
            identifier_policy: RateLimitPolicy::per_identifier(),
            trusted_proxies: Vec::new(),
        }
    }

    /// HttpOnly session cookie, SameSite=Lax
    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig::new(SESSION_COOKIE_NAME)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age_secs(self.session_ttl.as_secs())
    }

    /// Script-readable CSRF cookie, SameSite=Strict
    pub fn csrf_cookie(&self) -> CookieConfig {
        CookieConfig::new(CSRF_COOKIE_NAME)
            .http_only(false)
            .secure(self.cookie_secure)
            .same_site(SameSite::Strict)
            .max_age_secs(self.csrf_ttl.as_secs())
    }
}
