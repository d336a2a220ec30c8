//! Auth Middleware
//!
//! `require_auth` guards routes behind the JWT + session pair; `csrf_protect`
//! enforces the double-submit check on state-changing methods.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::extract_bearer_token;
use platform::cookie::extract_cookie;

use crate::application::authenticator::HybridAuthenticator;
use crate::application::config::{
    CSRF_BODY_FIELD, CSRF_COOKIE_NAME, CSRF_HEADER_NAME, SESSION_COOKIE_NAME,
};
use crate::application::csrf::{CsrfGuard, CsrfSubmission};
use crate::domain::identity::{CredentialVerifier, ProfileStore};
use crate::domain::repository::SessionRepository;
use crate::error::AuthError;

/// Largest body buffered while looking for a `csrf_token` field
const MAX_CSRF_BODY_BYTES: usize = 64 * 1024;

/// Middleware that requires a `Bearer` JWT and a matching session cookie.
///
/// The resolved [`AuthenticatedUser`](crate::application::AuthenticatedUser)
/// is inserted into request extensions.
pub async fn require_auth<I, S>(
    State(authenticator): State<Arc<HybridAuthenticator<I, S>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    I: CredentialVerifier + ProfileStore + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
{
    let jwt = extract_bearer_token(req.headers());
    let session_id = extract_cookie(req.headers(), SESSION_COOKIE_NAME);

    let user = authenticator
        .verify(jwt.as_deref(), session_id.as_deref())
        .await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Middleware that rejects state-changing requests without a valid CSRF
/// token pair. Safe methods pass through untouched.
pub async fn csrf_protect(
    State(guard): State<Arc<CsrfGuard>>,
    req: Request,
    next: Next,
) -> Response {
    if !CsrfGuard::requires_check(req.method()) {
        return next.run(req).await;
    }

    let method = req.method().clone();
    let cookie = extract_cookie(req.headers(), CSRF_COOKIE_NAME);
    let header_token = req
        .headers()
        .get(CSRF_HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    // Only dig into the body when the header is absent
    let (req, body_token) = if header_token.is_none() && is_json(&req) {
        match body_field(req).await {
            Ok(pair) => pair,
            Err(err) => return err.into_response(),
        }
    } else {
        (req, None)
    };

    let submission = CsrfSubmission {
        cookie: cookie.as_deref(),
        header: header_token.as_deref(),
        body_field: body_token.as_deref(),
    };

    if let Err(e) = guard.verify_request(&method, submission) {
        return AuthError::from(e).into_response();
    }

    next.run(req).await
}

fn is_json(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Buffer the body, pull out the token field, and hand back an equivalent
/// request for the inner handler.
async fn body_field(req: Request) -> Result<(Request, Option<String>), AuthError> {
    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_CSRF_BODY_BYTES)
        .await
        .map_err(|_| AuthError::InvalidInput("Request body too large".to_string()))?;

    let token = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|v| v.get(CSRF_BODY_FIELD)?.as_str().map(str::to_owned));

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}
