//! Application Layer
//!
//! Use cases and application services.

pub mod authenticator;
pub mod config;
pub mod csrf;
pub mod jwt;
pub mod rate_limiter;
pub mod session_store;
pub mod sign_in;
pub mod sweep;

// Re-exports
pub use authenticator::{AuthOutcome, AuthenticatedUser, HybridAuthenticator, RefreshOutcome};
pub use config::AuthConfig;
pub use csrf::{CsrfError, CsrfGuard, CsrfSubmission};
pub use jwt::{JwtClaims, JwtCodec, JwtError};
pub use rate_limiter::RateLimiter;
pub use session_store::SessionStore;
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sweep::AuthSweepers;
