//! Auth Router

use axum::middleware::from_fn_with_state;
use axum::{
    Router,
    routing::{get, post},
};
use platform::rate_limit::RateLimitStore;

use crate::domain::identity::{CredentialVerifier, ProfileStore};
use crate::domain::repository::SessionRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{csrf_protect, require_auth};

/// Auth routes, meant to be nested under `/auth`.
///
/// `refresh` and `logout` are CSRF-protected; `me` requires the full
/// JWT + session pair.
pub fn auth_router<I, S, L>(state: AuthAppState<I, S, L>) -> Router
where
    I: CredentialVerifier + ProfileStore + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let csrf_routes = Router::new()
        .route("/refresh", post(handlers::refresh::<I, S, L>))
        .route("/logout", post(handlers::logout::<I, S, L>))
        .route_layer(from_fn_with_state(state.csrf.clone(), csrf_protect));

    let protected_routes = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(from_fn_with_state(
            state.authenticator.clone(),
            require_auth::<I, S>,
        ));

    Router::new()
        .route("/login", post(handlers::login::<I, S, L>))
        .route("/csrf", get(handlers::issue_csrf_token::<I, S, L>))
        .merge(csrf_routes)
        .merge(protected_routes)
        .with_state(state)
}
