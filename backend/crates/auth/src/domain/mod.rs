//! Domain Layer
//!
//! Contains entities, value objects, and repository/provider traits.

pub mod entity;
pub mod identity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::session_record::SessionRecord;
pub use identity::{CredentialVerifier, IdentityError, ProfileStore, UserProfile};
pub use repository::{SessionError, SessionRepository};
