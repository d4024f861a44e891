//! Session lifecycle: login, logout and token validation.
//!
//! Nothing is stored between calls. Each operation is one round trip to the
//! identity provider and is never retried here.

use crate::{
    idp::{self, IdentityProvider, TokenSet},
    Error,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

/// Username and password for a single login attempt.
#[derive(Debug)]
pub struct Credential {
    pub user: String,
    pub password: SecretString,
}

impl Credential {
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Token pair handed back to the caller exactly as the provider issued it.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub refresh_expires_in: i64,
}

impl From<TokenSet> for Session {
    fn from(tokens: TokenSet) -> Self {
        Self {
            token: tokens.access_token,
            expires_in: tokens.expires_in,
            refresh_token: tokens.refresh_token,
            refresh_expires_in: tokens.refresh_expires_in,
        }
    }
}

pub struct SessionManager {
    idp: Arc<dyn IdentityProvider>,
}

impl SessionManager {
    #[must_use]
    pub fn new(idp: Arc<dyn IdentityProvider>) -> Self {
        Self { idp }
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    /// [`Error::InvalidCredentials`] when the provider rejects the credentials,
    /// whatever its reason; any other provider failure is returned as upstream.
    #[instrument(skip_all, fields(user = %credential.user))]
    pub async fn login(&self, credential: &Credential) -> Result<Session, Error> {
        match self.idp.login(&credential.user, &credential.password).await {
            Ok(tokens) => Ok(Session::from(tokens)),
            Err(idp::Error::Rejected { status, message }) => {
                debug!("login rejected ({}): {}", status, message);
                Err(Error::InvalidCredentials)
            }
            Err(err) => Err(Error::idp(format!("login {}", credential.user), err)),
        }
    }

    /// Invalidate the session behind `refresh_token`.
    ///
    /// # Errors
    /// Every provider failure is reported as [`Error::InvalidRefreshToken`].
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), Error> {
        self.idp.logout(refresh_token).await.map_err(|err| {
            warn!("logout failed: {}", err);
            Error::InvalidRefreshToken
        })
    }

    /// Whether the provider still considers `access_token` active.
    ///
    /// An inactive token is `Ok(false)`; only a failed introspection call is an error.
    ///
    /// # Errors
    /// Returns an upstream error if the provider cannot be asked.
    #[instrument(skip_all)]
    pub async fn is_valid_token(&self, access_token: &str) -> Result<bool, Error> {
        self.idp
            .introspect_token(access_token)
            .await
            .map_err(|err| Error::idp("introspect token", err))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::idp::memory::{IdpOperation, MemoryIdentityProvider};
    use crate::ErrorKind;

    fn tokens() -> TokenSet {
        TokenSet {
            access_token: "tok".to_string(),
            expires_in: 3600,
            refresh_token: "rtok".to_string(),
            refresh_expires_in: 3600,
        }
    }

    fn manager(idp: MemoryIdentityProvider) -> (SessionManager, Arc<MemoryIdentityProvider>) {
        let idp = Arc::new(idp);
        (SessionManager::new(idp.clone()), idp)
    }

    #[tokio::test]
    async fn login_passes_token_set_through() {
        let (sessions, _) = manager(MemoryIdentityProvider::new().with_account("diego", "x", tokens()));

        let session = sessions.login(&Credential::new("diego", "x")).await.unwrap();

        assert_eq!(
            session,
            Session {
                token: "tok".to_string(),
                expires_in: 3600,
                refresh_token: "rtok".to_string(),
                refresh_expires_in: 3600,
            }
        );
    }

    #[tokio::test]
    async fn wrong_password_hides_provider_detail() {
        let (sessions, _) = manager(MemoryIdentityProvider::new().with_account("diego", "x", tokens()));

        let err = sessions
            .login(&Credential::new("diego", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.to_string(), "user or password incorrect");
    }

    #[tokio::test]
    async fn login_outage_is_upstream() {
        let (sessions, _) = manager(
            MemoryIdentityProvider::new()
                .with_account("diego", "x", tokens())
                .failing(IdpOperation::Login),
        );

        let err = sessions.login(&Credential::new("diego", "x")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[tokio::test]
    async fn logout_failures_are_normalized() {
        let (sessions, idp) = manager(MemoryIdentityProvider::new().with_account("diego", "x", tokens()));

        let err = sessions.logout("unknown").await.unwrap_err();
        assert_eq!(err.to_string(), "invalid refresh token");

        sessions.logout("rtok").await.unwrap();
        assert_eq!(
            idp.operations().await,
            vec![IdpOperation::Logout, IdpOperation::Logout]
        );
    }

    #[tokio::test]
    async fn logout_outage_is_still_invalid_refresh_token() {
        let (sessions, _) = manager(MemoryIdentityProvider::new().failing(IdpOperation::Logout));

        let err = sessions.logout("rtok").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn inactive_token_is_false_not_error() {
        let (sessions, _) = manager(MemoryIdentityProvider::new().with_active_token("live"));

        assert!(sessions.is_valid_token("live").await.unwrap());
        assert!(!sessions.is_valid_token("stale").await.unwrap());
    }

    #[tokio::test]
    async fn failed_introspection_is_error_not_false() {
        let (sessions, _) = manager(
            MemoryIdentityProvider::new()
                .with_active_token("live")
                .failing(IdpOperation::IntrospectToken),
        );

        let err = sessions.is_valid_token("live").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.to_string().starts_with("introspect token: "));
    }

    #[tokio::test]
    async fn logout_deactivates_issued_access_token() {
        let (sessions, _) = manager(MemoryIdentityProvider::new().with_account("diego", "x", tokens()));

        let session = sessions.login(&Credential::new("diego", "x")).await.unwrap();
        assert!(sessions.is_valid_token(&session.token).await.unwrap());

        sessions.logout(&session.refresh_token).await.unwrap();
        assert!(!sessions.is_valid_token(&session.token).await.unwrap());
    }
}
