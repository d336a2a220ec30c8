//! Hybrid Authenticator
//!
//! A login yields two credentials bound to the same user: a JWT returned in
//! the response body and a server-side session referenced by cookie. Every
//! later request must present both.

use std::time::Duration;

use platform::password::ClearTextPassword;
use serde::Serialize;

use crate::application::jwt::JwtCodec;
use crate::application::session_store::SessionStore;
use crate::domain::entity::session_record::SessionRecord;
use crate::domain::identity::{CredentialVerifier, IdentityError, ProfileStore};
use crate::domain::repository::{SessionError, SessionRepository};
use crate::domain::value_object::{
    email::Email, session_id::SessionId, user_id::UserId, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

/// Identity resolved from a verified JWT + session pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Email,
    pub role: UserRole,
}

impl From<&SessionRecord> for AuthenticatedUser {
    fn from(record: &SessionRecord) -> Self {
        Self {
            user_id: record.user_id.clone(),
            email: record.email.clone(),
            role: record.role,
        }
    }
}

/// Result of a successful login
#[derive(Debug)]
pub struct AuthOutcome {
    pub session_id: SessionId,
    pub jwt: String,
    pub user: AuthenticatedUser,
}

/// Result of a successful refresh
#[derive(Debug)]
pub struct RefreshOutcome {
    pub session_id: SessionId,
    pub jwt: String,
    pub user: AuthenticatedUser,
}

pub struct HybridAuthenticator<I, S>
where
    I: CredentialVerifier + ProfileStore,
    S: SessionRepository,
{
    identity: I,
    sessions: SessionStore<S>,
    jwt: JwtCodec,
    identity_timeout: Duration,
}

impl<I, S> HybridAuthenticator<I, S>
where
    I: CredentialVerifier + ProfileStore,
    S: SessionRepository,
{
    pub fn new(
        identity: I,
        sessions: SessionStore<S>,
        jwt: JwtCodec,
        identity_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            sessions,
            jwt,
            identity_timeout,
        }
    }

    pub fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    /// Check credentials with the identity provider, then issue a session
    /// and a JWT for the same user.
    pub async fn authenticate(
        &self,
        email: &Email,
        password: &ClearTextPassword,
    ) -> AuthResult<AuthOutcome> {
        let user_id = self
            .bounded(self.identity.verify_credentials(email, password))
            .await
            .map_err(|e| match e {
                IdentityError::Rejected => AuthError::InvalidCredentials,
                IdentityError::Unavailable(msg) => AuthError::IdentityUnavailable(msg),
            })?;

        let profile = self
            .bounded(self.identity.find_profile(&user_id))
            .await
            .map_err(|e| match e {
                IdentityError::Rejected => AuthError::ProfileNotFound,
                IdentityError::Unavailable(msg) => AuthError::IdentityUnavailable(msg),
            })?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "Authenticated user has no profile");
                AuthError::ProfileNotFound
            })?;

        let jwt = self
            .jwt
            .create(&user_id, email, profile.role)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let (session_id, record) = self
            .sessions
            .create(&user_id, email, profile.role)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        tracing::info!(
            user_id = %user_id,
            session = %session_id,
            role = %profile.role,
            "User signed in"
        );

        Ok(AuthOutcome {
            session_id,
            jwt,
            user: AuthenticatedUser::from(&record),
        })
    }

    /// Resolve the caller from a JWT and a session id; both are required
    /// and must name the same user.
    pub async fn verify(
        &self,
        jwt: Option<&str>,
        session_id: Option<&str>,
    ) -> AuthResult<AuthenticatedUser> {
        let (Some(jwt), Some(session_id)) = (jwt, session_id) else {
            return Err(AuthError::MissingCredentials);
        };

        let claims = self.jwt.verify(jwt).map_err(|e| {
            tracing::debug!(error = %e, "JWT rejected");
            AuthError::InvalidToken
        })?;

        let session_id = SessionId::parse(session_id).ok_or(AuthError::InvalidSession)?;
        let record = self
            .sessions
            .verify(&session_id, &claims.user_id)
            .await
            .map_err(|e| match e {
                SessionError::NotFound | SessionError::Expired => AuthError::InvalidSession,
                SessionError::OwnerMismatch => AuthError::CredentialMismatch,
                SessionError::Backend(msg) => AuthError::Internal(msg),
            })?;

        Ok(AuthenticatedUser::from(&record))
    }

    /// Restart the session TTL and issue a fresh JWT for the same user
    pub async fn refresh(&self, session_id: Option<&str>) -> AuthResult<RefreshOutcome> {
        let session_id = session_id
            .and_then(SessionId::parse)
            .ok_or(AuthError::NoActiveSession)?;

        let record = self
            .sessions
            .extend(&session_id)
            .await
            .map_err(|e| match e {
                SessionError::NotFound
                | SessionError::Expired
                | SessionError::OwnerMismatch => AuthError::NoActiveSession,
                SessionError::Backend(msg) => AuthError::Internal(msg),
            })?;

        let jwt = self
            .jwt
            .create(&record.user_id, &record.email, record.role)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        tracing::debug!(user_id = %record.user_id, session = %session_id, "Session refreshed");

        Ok(RefreshOutcome {
            session_id,
            jwt,
            user: AuthenticatedUser::from(&record),
        })
    }

    /// Destroy the session if there is one. Never fails.
    pub async fn logout(&self, session_id: Option<&str>) {
        let Some(session_id) = session_id.and_then(SessionId::parse) else {
            return;
        };

        match self.sessions.destroy(&session_id).await {
            Ok(()) => tracing::info!(session = %session_id, "User signed out"),
            Err(e) => tracing::warn!(session = %session_id, error = %e, "Failed to destroy session"),
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, IdentityError>>,
    ) -> Result<T, IdentityError> {
        match tokio::time::timeout(self.identity_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(IdentityError::Unavailable(format!(
                "no response within {}ms",
                self.identity_timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::UserProfile;
    use crate::infra::memory::MemorySessionRepository;
    use platform::clock::ManualClock;
    use std::collections::HashMap;
    use std::sync::Arc;

    const SECRET: &[u8] = b"test-secret-test-secret-test-sec";
    const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

    /// Accepts `password` for every known email
    #[derive(Clone, Default)]
    struct FakeIdentity {
        users: HashMap<String, (UserId, Option<UserRole>)>,
        delay: Option<Duration>,
        down: bool,
    }

    impl FakeIdentity {
        fn with_user(mut self, email: &str, id: &str, role: Option<UserRole>) -> Self {
            self.users
                .insert(email.to_string(), (UserId::new(id).unwrap(), role));
            self
        }
    }

    impl CredentialVerifier for FakeIdentity {
        async fn verify_credentials(
            &self,
            email: &Email,
            password: &ClearTextPassword,
        ) -> Result<UserId, IdentityError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.down {
                return Err(IdentityError::Unavailable("connection refused".into()));
            }
            match self.users.get(email.as_str()) {
                Some((id, _)) if password.expose() == "password" => Ok(id.clone()),
                _ => Err(IdentityError::Rejected),
            }
        }
    }

    impl ProfileStore for FakeIdentity {
        async fn find_profile(
            &self,
            user_id: &UserId,
        ) -> Result<Option<UserProfile>, IdentityError> {
            Ok(self
                .users
                .values()
                .find(|(id, _)| id == user_id)
                .and_then(|(id, role)| {
                    role.map(|role| UserProfile {
                        user_id: id.clone(),
                        role,
                    })
                }))
        }
    }

    fn authenticator(
        identity: FakeIdentity,
    ) -> (
        HybridAuthenticator<FakeIdentity, MemorySessionRepository>,
        Arc<ManualClock>,
    ) {
        let clock = Arc::new(ManualClock::starting_now());
        let sessions = SessionStore::new(MemorySessionRepository::new(), WEEK, clock.clone());
        let jwt = JwtCodec::new(SECRET, WEEK, clock.clone());
        (
            HybridAuthenticator::new(identity, sessions, jwt, Duration::from_secs(5)),
            clock,
        )
    }

    fn users() -> FakeIdentity {
        FakeIdentity::default()
            .with_user("a@example.com", "user-a", Some(UserRole::Admin))
            .with_user("b@example.com", "user-b", Some(UserRole::User))
            .with_user("ghost@example.com", "user-ghost", None)
    }

    fn email(s: &str) -> Email {
        Email::new(s).unwrap()
    }

    fn pw(s: &str) -> ClearTextPassword {
        ClearTextPassword::new(s.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_binds_jwt_and_session_to_same_user() {
        let (auth, _) = authenticator(users());
        let outcome = auth
            .authenticate(&email("a@example.com"), &pw("password"))
            .await
            .unwrap();

        assert_eq!(outcome.user.user_id.as_str(), "user-a");
        assert_eq!(outcome.user.role, UserRole::Admin);

        let user = auth
            .verify(Some(&outcome.jwt), Some(outcome.session_id.expose()))
            .await
            .unwrap();
        assert_eq!(user, outcome.user);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let (auth, _) = authenticator(users());

        let wrong = auth
            .authenticate(&email("a@example.com"), &pw("nope"))
            .await
            .unwrap_err();
        let unknown = auth
            .authenticate(&email("nobody@example.com"), &pw("password"))
            .await
            .unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.client_message(), unknown.client_message());
    }

    #[tokio::test]
    async fn test_missing_profile() {
        let (auth, _) = authenticator(users());
        let err = auth
            .authenticate(&email("ghost@example.com"), &pw("password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ProfileNotFound));
        assert_eq!(auth.sessions().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_identity_provider_down() {
        let identity = FakeIdentity {
            down: true,
            ..users()
        };
        let (auth, _) = authenticator(identity);
        let err = auth
            .authenticate(&email("a@example.com"), &pw("password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::IdentityUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_provider_timeout() {
        let identity = FakeIdentity {
            delay: Some(Duration::from_secs(30)),
            ..users()
        };
        let (auth, _) = authenticator(identity);
        let err = auth
            .authenticate(&email("a@example.com"), &pw("password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::IdentityUnavailable(_)));
    }

    #[tokio::test]
    async fn test_verify_requires_both_credentials() {
        let (auth, _) = authenticator(users());
        let outcome = auth
            .authenticate(&email("a@example.com"), &pw("password"))
            .await
            .unwrap();

        assert!(matches!(
            auth.verify(Some(&outcome.jwt), None).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            auth.verify(None, Some(outcome.session_id.expose())).await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_crossed_credentials() {
        let (auth, _) = authenticator(users());
        let a = auth
            .authenticate(&email("a@example.com"), &pw("password"))
            .await
            .unwrap();
        let b = auth
            .authenticate(&email("b@example.com"), &pw("password"))
            .await
            .unwrap();

        assert!(matches!(
            auth.verify(Some(&a.jwt), Some(b.session_id.expose())).await,
            Err(AuthError::CredentialMismatch)
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_bad_token_and_session() {
        let (auth, _) = authenticator(users());
        let outcome = auth
            .authenticate(&email("a@example.com"), &pw("password"))
            .await
            .unwrap();

        assert!(matches!(
            auth.verify(Some("not.a.jwt"), Some(outcome.session_id.expose()))
                .await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            auth.verify(Some(&outcome.jwt), Some("not-a-session-id")).await,
            Err(AuthError::InvalidSession)
        ));
        let unknown = SessionId::generate();
        assert!(matches!(
            auth.verify(Some(&outcome.jwt), Some(unknown.expose())).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_logout_then_verify_fails() {
        let (auth, _) = authenticator(users());
        let outcome = auth
            .authenticate(&email("a@example.com"), &pw("password"))
            .await
            .unwrap();

        auth.logout(Some(outcome.session_id.expose())).await;
        auth.logout(Some(outcome.session_id.expose())).await;
        auth.logout(None).await;

        assert!(matches!(
            auth.verify(Some(&outcome.jwt), Some(outcome.session_id.expose()))
                .await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_refresh_extends_session_and_issues_new_jwt() {
        let (auth, clock) = authenticator(users());
        let outcome = auth
            .authenticate(&email("b@example.com"), &pw("password"))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(6 * 24 * 3600));
        let refreshed = auth
            .refresh(Some(outcome.session_id.expose()))
            .await
            .unwrap();
        assert_eq!(refreshed.user, outcome.user);

        // Past the original expiry of both the session and the first JWT
        clock.advance(Duration::from_secs(3 * 24 * 3600));
        assert!(
            auth.verify(Some(&refreshed.jwt), Some(outcome.session_id.expose()))
                .await
                .is_ok()
        );
        assert!(matches!(
            auth.verify(Some(&outcome.jwt), Some(outcome.session_id.expose()))
                .await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_live_session() {
        let (auth, clock) = authenticator(users());
        assert!(matches!(
            auth.refresh(None).await,
            Err(AuthError::NoActiveSession)
        ));

        let outcome = auth
            .authenticate(&email("a@example.com"), &pw("password"))
            .await
            .unwrap();
        clock.advance(WEEK);
        assert!(matches!(
            auth.refresh(Some(outcome.session_id.expose())).await,
            Err(AuthError::NoActiveSession)
        ));
    }
}
