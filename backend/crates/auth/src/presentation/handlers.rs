//! HTTP Handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse};
use axum::{Extension, Json};
use platform::client::{client_key, extract_client_ip};
use platform::clock::SharedClock;
use platform::cookie::{CookieConfig, delete_cookie_header, extract_cookie, set_cookie_header};
use platform::rate_limit::{MemoryRateLimitStore, RateLimitStore};

use crate::application::authenticator::{AuthenticatedUser, HybridAuthenticator};
use crate::application::config::{AuthConfig, SESSION_COOKIE_NAME};
use crate::application::csrf::CsrfGuard;
use crate::application::jwt::JwtCodec;
use crate::application::rate_limiter::RateLimiter;
use crate::application::session_store::SessionStore;
use crate::application::sign_in::{SignInInput, SignInUseCase};
use crate::domain::identity::{CredentialVerifier, ProfileStore};
use crate::domain::repository::SessionRepository;
use crate::error::{AuthError, AuthResult};
use crate::infra::memory::MemorySessionRepository;
use crate::presentation::dto::{
    CsrfTokenResponse, LoginRequest, LoginResponse, MeResponse, RefreshResponse,
};

/// Shared state for auth handlers
pub struct AuthAppState<I, S, L>
where
    I: CredentialVerifier + ProfileStore,
    S: SessionRepository,
    L: RateLimitStore,
{
    pub sign_in: Arc<SignInUseCase<I, S, L>>,
    pub authenticator: Arc<HybridAuthenticator<I, S>>,
    pub limiter: Arc<RateLimiter<L>>,
    pub csrf: Arc<CsrfGuard>,
    pub config: Arc<AuthConfig>,
}

impl<I, S, L> Clone for AuthAppState<I, S, L>
where
    I: CredentialVerifier + ProfileStore,
    S: SessionRepository,
    L: RateLimitStore,
{
    fn clone(&self) -> Self {
        Self {
            sign_in: self.sign_in.clone(),
            authenticator: self.authenticator.clone(),
            limiter: self.limiter.clone(),
            csrf: self.csrf.clone(),
            config: self.config.clone(),
        }
    }
}

impl<I, S, L> AuthAppState<I, S, L>
where
    I: CredentialVerifier + ProfileStore,
    S: SessionRepository,
    L: RateLimitStore,
{
    pub fn new(
        identity: I,
        sessions: S,
        by_ip: L,
        by_identifier: L,
        config: AuthConfig,
        clock: SharedClock,
    ) -> Self {
        let authenticator = Arc::new(HybridAuthenticator::new(
            identity,
            SessionStore::new(sessions, config.session_ttl, clock.clone()),
            JwtCodec::new(&config.jwt_secret, config.jwt_ttl, clock.clone()),
            config.identity_timeout,
        ));
        let limiter = Arc::new(RateLimiter::new(
            by_ip,
            by_identifier,
            config.ip_policy,
            config.identifier_policy,
            clock.clone(),
        ));
        let csrf = Arc::new(CsrfGuard::new(&config.csrf_secret, config.csrf_ttl, clock));
        let sign_in = Arc::new(SignInUseCase::new(
            authenticator.clone(),
            limiter.clone(),
            csrf.clone(),
        ));

        Self {
            sign_in,
            authenticator,
            limiter,
            csrf,
            config: Arc::new(config),
        }
    }
}

impl<I> AuthAppState<I, MemorySessionRepository, MemoryRateLimitStore>
where
    I: CredentialVerifier + ProfileStore,
{
    /// Process-local sessions and rate limits
    pub fn in_memory(identity: I, config: AuthConfig, clock: SharedClock) -> Self {
        Self::new(
            identity,
            MemorySessionRepository::new(),
            MemoryRateLimitStore::new(),
            MemoryRateLimitStore::new(),
            config,
            clock,
        )
    }
}

fn cookie_header(config: &CookieConfig, value: &str) -> AuthResult<axum::http::HeaderValue> {
    set_cookie_header(config, value)
        .ok_or_else(|| AuthError::Internal(format!("unencodable {} cookie", config.name)))
}

// ============================================================================
// Login
// ============================================================================

/// POST /auth/login
pub async fn login<I, S, L>(
    State(state): State<AuthAppState<I, S, L>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<impl IntoResponse>
where
    I: CredentialVerifier + ProfileStore + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let Json(req) = payload.map_err(|e| AuthError::InvalidInput(e.body_text()))?;

    let client = client_key(extract_client_ip(
        &headers,
        Some(addr.ip()),
        &state.config.trusted_proxies,
    ));

    let output = state
        .sign_in
        .execute(SignInInput {
            email: req.email,
            password: req.password,
            client_key: client,
        })
        .await?;

    let session_cookie = cookie_header(&state.config.session_cookie(), output.session_id.expose())?;
    let csrf_cookie = cookie_header(&state.config.csrf_cookie(), &output.csrf_token)?;

    Ok((
        StatusCode::OK,
        AppendHeaders([
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, csrf_cookie),
        ]),
        Json(LoginResponse {
            success: true,
            jwt: output.jwt,
            user: output.user,
            csrf_token: output.csrf_token,
        }),
    ))
}

// ============================================================================
// Refresh
// ============================================================================

/// POST /auth/refresh
pub async fn refresh<I, S, L>(
    State(state): State<AuthAppState<I, S, L>>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse>
where
    I: CredentialVerifier + ProfileStore + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let session_id = extract_cookie(&headers, SESSION_COOKIE_NAME);
    let outcome = state.authenticator.refresh(session_id.as_deref()).await?;

    // Re-issue the cookie so its Max-Age matches the extended session
    let session_cookie =
        cookie_header(&state.config.session_cookie(), outcome.session_id.expose())?;

    Ok((
        [(header::SET_COOKIE, session_cookie)],
        Json(RefreshResponse {
            jwt: outcome.jwt,
            user: outcome.user,
        }),
    ))
}

// ============================================================================
// Logout
// ============================================================================

/// POST /auth/logout
pub async fn logout<I, S, L>(
    State(state): State<AuthAppState<I, S, L>>,
    headers: HeaderMap,
) -> impl IntoResponse
where
    I: CredentialVerifier + ProfileStore + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let session_id = extract_cookie(&headers, SESSION_COOKIE_NAME);
    state.authenticator.logout(session_id.as_deref()).await;

    let mut response_headers = HeaderMap::new();
    if let Some(clear) = delete_cookie_header(&state.config.session_cookie()) {
        response_headers.append(header::SET_COOKIE, clear);
    }

    (StatusCode::NO_CONTENT, response_headers)
}

// ============================================================================
// Identity / CSRF
// ============================================================================

/// GET /auth/me (behind `require_auth`)
pub async fn me(Extension(user): Extension<AuthenticatedUser>) -> Json<MeResponse> {
    Json(MeResponse { user })
}

/// GET /auth/csrf
pub async fn issue_csrf_token<I, S, L>(
    State(state): State<AuthAppState<I, S, L>>,
) -> AuthResult<impl IntoResponse>
where
    I: CredentialVerifier + ProfileStore + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let token = state.csrf.generate();
    let csrf_cookie = cookie_header(&state.config.csrf_cookie(), &token)?;

    Ok((
        [(header::SET_COOKIE, csrf_cookie)],
        Json(CsrfTokenResponse { csrf_token: token }),
    ))
}
