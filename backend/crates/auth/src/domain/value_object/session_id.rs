//! Session ID Value Object
//!
//! 256-bit random identifier, rendered as 64 lowercase hex characters.

use std::fmt;

use platform::crypto::random_hex;

/// Session id length in bytes
const SESSION_ID_BYTES: usize = 32;

/// Opaque server-side session key
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh id from the OS random source
    pub fn generate() -> Self {
        Self(random_hex(SESSION_ID_BYTES))
    }

    /// Parse a cookie value; anything but 64 lowercase hex chars is `None`
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == SESSION_ID_BYTES * 2
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(raw.to_string()))
    }

    /// Full value, only for the Set-Cookie header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Prefix safe to write to logs
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({}…)", self.short())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", self.short())
    }
}
