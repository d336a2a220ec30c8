//! JWT Codec
//!
//! HS256 tokens carrying the user's identity claims. Expiry is checked
//! against the injected [`Clock`], not the library's system time.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use platform::clock::{Clock, SharedClock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_object::{email::Email, user_id::UserId, user_role::UserRole};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwtError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub email: Email,
    pub role: UserRole,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expires at (seconds since epoch)
    pub exp: i64,
}

/// Stateless token issuer/verifier
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: SharedClock,
}

impl JwtCodec {
    pub fn new(secret: &[u8], ttl: Duration, clock: SharedClock) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is compared with the injected clock in `verify`
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
            clock,
        }
    }

    /// Sign a token valid from now until now + ttl
    pub fn create(&self, user_id: &UserId, email: &Email, role: UserRole) -> Result<String, JwtError> {
        let iat = self.clock.now().timestamp();
        let claims = JwtClaims {
            user_id: user_id.clone(),
            email: email.clone(),
            role,
            iat,
            exp: iat + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<JwtClaims, JwtError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                JwtErrorKind::InvalidSignature => JwtError::InvalidSignature,
                JwtErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Malformed,
            },
        )?;

        if self.clock.now().timestamp() > data.claims.exp {
            return Err(JwtError::Expired);
        }

        Ok(data.claims)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
