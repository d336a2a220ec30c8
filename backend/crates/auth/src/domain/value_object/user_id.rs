//! User ID Value Object
//!
//! Opaque identifier assigned by the identity provider.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length of an external user id
const USER_ID_MAX_LENGTH: usize = 128;

/// Identity-provider user id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Accept an id from the identity provider; `None` if empty, oversized
    /// or containing whitespace/control characters
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= USER_ID_MAX_LENGTH
            && !id.chars().any(|c| c.is_whitespace() || c.is_control());
        valid.then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
