//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Value objects, session record, repository and identity traits
//! - `application/` - JWT codec, CSRF guard, rate limiter, session store,
//!   hybrid authenticator, sign-in use case, background sweeps
//! - `infra/` - In-memory session map, identity provider integrations
//! - `presentation/` - HTTP handlers, DTOs, middleware, router
//!
//! ## Security Model
//! - Every login yields a JWT (response body) and a server-side session
//!   (HttpOnly cookie); protected calls need both, bound to one user
//! - State-changing requests carry a double-submit CSRF token
//! - Login attempts are rate-limited per client IP and per email
//! - Credential failures are reported generically
//! - No signing secret means no startup

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{AuthConfig, ConfigError};
pub use application::{AuthSweepers, AuthenticatedUser, HybridAuthenticator};
pub use error::{AuthError, AuthResult};
pub use infra::{IdentityBackend, IdentityConfigError, MemorySessionRepository};
pub use presentation::{AuthAppState, auth_router, csrf_protect, require_auth};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
