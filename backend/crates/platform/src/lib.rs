//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Injectable wall clock
//! - Cryptographic utilities (random tokens, HMAC-SHA256, constant-time compare)
//! - Password hashing (Argon2id)
//! - Cookie building and extraction
//! - Client IP and bearer-token extraction
//! - Sliding-window rate limit storage
//! - Cancellable background sweepers

pub mod client;
pub mod clock;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod rate_limit;
pub mod sweeper;
