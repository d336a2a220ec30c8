//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::application::authenticator::AuthenticatedUser;

// ============================================================================
// Login
// ============================================================================

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response; the session id travels only in its cookie
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub jwt: String,
    pub user: AuthenticatedUser,
    pub csrf_token: String,
}

// ============================================================================
// Refresh / identity
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub jwt: String,
    pub user: AuthenticatedUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user: AuthenticatedUser,
}

// ============================================================================
// CSRF
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}
