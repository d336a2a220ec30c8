//! Shared Kernel - Domain-crossing minimal core
//!
//! The error vocabulary shared by every crate in the workspace:
//! - [`error::kind::ErrorKind`] maps failures onto HTTP status classes
//! - [`error::app_error::AppError`] is the single boundary error rendered to clients
//!
//! Domain crates keep their own `thiserror` enums and convert into
//! `AppError` only at the HTTP boundary.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
