//! Infrastructure Layer
//!
//! In-memory session storage and identity provider integrations.

pub mod identity;
pub mod memory;
pub mod remote_identity;
pub mod static_identity;

pub use identity::{IdentityBackend, IdentityConfigError};
pub use memory::MemorySessionRepository;
pub use remote_identity::RemoteIdentityProvider;
pub use static_identity::StaticIdentityProvider;
