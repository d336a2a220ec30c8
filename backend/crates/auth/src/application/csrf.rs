//! CSRF Guard
//!
//! Stateless double-submit tokens of the form `timestamp.random.signature`,
//! where `signature = base64url(HMAC-SHA256(secret, "timestamp.random"))`.

use std::time::Duration;

use axum::http::Method;
use platform::clock::{Clock, SharedClock};
use platform::crypto::{
    constant_time_eq, from_base64url, hmac_sha256, random_token, to_base64url, verify_hmac_sha256,
};
use thiserror::Error;

/// Random segment length in bytes
const RANDOM_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsrfError {
    #[error("Malformed CSRF token")]
    Malformed,

    #[error("Invalid CSRF token signature")]
    InvalidSignature,

    #[error("CSRF token expired")]
    Expired,

    #[error("CSRF violation: {0}")]
    Violation(&'static str),
}

/// Token material presented by one request
#[derive(Debug, Default, Clone, Copy)]
pub struct CsrfSubmission<'a> {
    pub cookie: Option<&'a str>,
    pub header: Option<&'a str>,
    pub body_field: Option<&'a str>,
}

#[derive(Clone)]
pub struct CsrfGuard {
    secret: Vec<u8>,
    ttl: Duration,
    clock: SharedClock,
}

impl CsrfGuard {
    pub fn new(secret: &[u8], ttl: Duration, clock: SharedClock) -> Self {
        Self {
            secret: secret.to_vec(),
            ttl,
            clock,
        }
    }

    /// Mint a fresh token
    pub fn generate(&self) -> String {
        let payload = format!("{}.{}", self.clock.now_ms(), random_token(RANDOM_BYTES));
        let signature = to_base64url(&hmac_sha256(&self.secret, payload.as_bytes()));
        format!("{payload}.{signature}")
    }

    /// Check structure, signature and age of a token
    pub fn validate(&self, token: &str) -> Result<(), CsrfError> {
        let mut parts = token.split('.');
        let (Some(timestamp), Some(random), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CsrfError::Malformed);
        };
        if timestamp.is_empty() || random.is_empty() || signature.is_empty() {
            return Err(CsrfError::Malformed);
        }

        let issued_ms: i64 = timestamp.parse().map_err(|_| CsrfError::Malformed)?;
        let tag = from_base64url(signature).map_err(|_| CsrfError::Malformed)?;

        let payload = &token[..timestamp.len() + 1 + random.len()];
        if !verify_hmac_sha256(&self.secret, payload.as_bytes(), &tag) {
            return Err(CsrfError::InvalidSignature);
        }

        let age_ms = self.clock.now_ms() - issued_ms;
        if age_ms > self.ttl.as_millis() as i64 {
            return Err(CsrfError::Expired);
        }

        Ok(())
    }

    /// Methods that change state and therefore need a token
    pub fn requires_check(method: &Method) -> bool {
        matches!(
            *method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    /// Double-submit check for one request
    ///
    /// The header wins over the body field when both are present.
    pub fn verify_request(
        &self,
        method: &Method,
        submission: CsrfSubmission<'_>,
    ) -> Result<(), CsrfError> {
        if !Self::requires_check(method) {
            return Ok(());
        }

        let cookie = submission
            .cookie
            .ok_or(CsrfError::Violation("missing CSRF cookie"))?;
        self.validate(cookie)
            .map_err(|_| CsrfError::Violation("invalid CSRF cookie"))?;

        let supplied = submission
            .header
            .or(submission.body_field)
            .ok_or(CsrfError::Violation("missing CSRF token"))?;

        if !constant_time_eq(cookie.as_bytes(), supplied.as_bytes()) {
            return Err(CsrfError::Violation("CSRF token mismatch"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::clock::ManualClock;
    use std::sync::Arc;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn setup() -> (CsrfGuard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (CsrfGuard::new(b"csrf-secret-csrf-secret-csrf-sec", DAY, clock.clone()), clock)
    }

    #[test]
    fn test_token_format() {
        let (guard, clock) = setup();
        let token = guard.generate();
        let parts: Vec<&str> = token.split('.').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].parse::<i64>().unwrap(), clock.now_ms());
        assert_eq!(from_base64url(parts[1]).unwrap().len(), RANDOM_BYTES);
        assert_eq!(from_base64url(parts[2]).unwrap().len(), 32);
    }

    #[test]
    fn test_validate_within_ttl() {
        let (guard, clock) = setup();
        let token = guard.generate();

        assert!(guard.validate(&token).is_ok());
        clock.advance(DAY - Duration::from_secs(1));
        assert!(guard.validate(&token).is_ok());
    }

    #[test]
    fn test_validate_expired() {
        let (guard, clock) = setup();
        let token = guard.generate();

        clock.advance(DAY + Duration::from_millis(1));
        assert_eq!(guard.validate(&token).unwrap_err(), CsrfError::Expired);
    }

    #[test]
    fn test_validate_altered_signature() {
        let (guard, _) = setup();
        let token = guard.generate();

        let mut altered = token.clone();
        let last = altered.pop().unwrap();
        altered.push(if last == 'A' { 'B' } else { 'A' });
        assert_ne!(guard.validate(&altered), Ok(()));

        let (payload, _) = token.rsplit_once('.').unwrap();
        let forged = format!("{payload}.{}", to_base64url(&[0u8; 32]));
        assert_eq!(guard.validate(&forged).unwrap_err(), CsrfError::InvalidSignature);
    }

    #[test]
    fn test_validate_altered_timestamp() {
        let (guard, _) = setup();
        let token = guard.generate();
        let (ts, rest) = token.split_once('.').unwrap();
        let bumped = format!("{}.{}", ts.parse::<i64>().unwrap() + 1, rest);

        assert_eq!(guard.validate(&bumped).unwrap_err(), CsrfError::InvalidSignature);
    }

    #[test]
    fn test_validate_malformed() {
        let (guard, _) = setup();
        assert_eq!(guard.validate("").unwrap_err(), CsrfError::Malformed);
        assert_eq!(guard.validate("a.b").unwrap_err(), CsrfError::Malformed);
        assert_eq!(guard.validate("a.b.c.d").unwrap_err(), CsrfError::Malformed);
        assert_eq!(guard.validate("x.abc.def").unwrap_err(), CsrfError::Malformed);
        assert_eq!(guard.validate("1..def").unwrap_err(), CsrfError::Malformed);
        assert_eq!(guard.validate("1.abc.!!!").unwrap_err(), CsrfError::Malformed);
    }

    #[test]
    fn test_other_secret_rejected() {
        let (guard, clock) = setup();
        let other = CsrfGuard::new(b"other-secret-other-secret-other!", DAY, clock);
        assert_eq!(
            other.validate(&guard.generate()).unwrap_err(),
            CsrfError::InvalidSignature
        );
    }

    #[test]
    fn test_safe_methods_skip_check() {
        let (guard, _) = setup();
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert!(guard.verify_request(&method, CsrfSubmission::default()).is_ok());
        }
    }

    #[test]
    fn test_double_submit_header_and_body() {
        let (guard, _) = setup();
        let token = guard.generate();

        let via_header = CsrfSubmission {
            cookie: Some(&token),
            header: Some(&token),
            body_field: None,
        };
        assert!(guard.verify_request(&Method::POST, via_header).is_ok());

        let via_body = CsrfSubmission {
            cookie: Some(&token),
            header: None,
            body_field: Some(&token),
        };
        assert!(guard.verify_request(&Method::DELETE, via_body).is_ok());
    }

    #[test]
    fn test_double_submit_violations() {
        let (guard, _) = setup();
        let token = guard.generate();
        let other = guard.generate();

        let missing_cookie = CsrfSubmission {
            cookie: None,
            header: Some(&token),
            body_field: None,
        };
        assert!(matches!(
            guard.verify_request(&Method::POST, missing_cookie),
            Err(CsrfError::Violation(_))
        ));

        let missing_supplied = CsrfSubmission {
            cookie: Some(&token),
            header: None,
            body_field: None,
        };
        assert!(matches!(
            guard.verify_request(&Method::PUT, missing_supplied),
            Err(CsrfError::Violation(_))
        ));

        let mismatch = CsrfSubmission {
            cookie: Some(&token),
            header: Some(&other),
            body_field: None,
        };
        assert!(matches!(
            guard.verify_request(&Method::PATCH, mismatch),
            Err(CsrfError::Violation(_))
        ));

        let forged_cookie = CsrfSubmission {
            cookie: Some("1.abc.def"),
            header: Some("1.abc.def"),
            body_field: None,
        };
        assert!(matches!(
            guard.verify_request(&Method::POST, forged_cookie),
            Err(CsrfError::Violation(_))
        ));
    }

    #[test]
    fn test_header_preferred_over_body() {
        let (guard, _) = setup();
        let token = guard.generate();

        let submission = CsrfSubmission {
            cookie: Some(&token),
            header: Some("wrong"),
            body_field: Some(&token),
        };
        assert!(guard.verify_request(&Method::POST, submission).is_err());
    }
}
