//! Identity Provider contract.
//!
//! [`IdentityProvider`] is the seam between the orchestrators and the system of
//! record for credentials and accounts. [`keycloak::KeycloakClient`] talks to a
//! Keycloak-compatible REST API; [`memory::MemoryIdentityProvider`] keeps
//! everything in process and records each call.
//!
//! Directory calls take the caller's bearer token and must forward it as-is.

pub mod keycloak;
pub mod memory;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The provider refused the request (bad credentials, invalid or expired token).
    #[error("rejected by identity provider ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("not found in identity provider: {0}")]
    NotFound(String),

    #[error("identity provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid identity provider response: {0}")]
    Decode(String),
}

/// Token payload returned by the provider on a successful password grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub refresh_expires_in: i64,
}

/// User record as the provider represents it. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Realm role reference, resolved by name before a user is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange username and password for a token set.
    async fn login(&self, username: &str, password: &SecretString) -> Result<TokenSet>;

    /// Invalidate the session behind a refresh token.
    async fn logout(&self, refresh_token: &str) -> Result<()>;

    /// Ask the provider whether an access token is currently active.
    async fn introspect_token(&self, access_token: &str) -> Result<bool>;

    async fn list_users(&self, token: &str) -> Result<Vec<IdpUser>>;

    /// Users whose username matches `username`. Providers may return more than one.
    async fn find_users_by_username(&self, token: &str, username: &str) -> Result<Vec<IdpUser>>;

    async fn get_user_by_id(&self, token: &str, id: &str) -> Result<IdpUser>;

    async fn get_role_by_name(&self, token: &str, name: &str) -> Result<Role>;

    /// Create the account, attach `role` to it and return the new id.
    async fn create_user(&self, token: &str, role: &Role, user: &IdpUser) -> Result<String>;

    async fn delete_user_by_id(&self, token: &str, id: &str) -> Result<()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn idp_user_uses_camel_case_and_tolerates_missing_fields() {
        let user: IdpUser = serde_json::from_value(json!({
            "id": "1",
            "username": "diegof",
            "firstName": "Diego",
            "createdTimestamp": 1_700_000_000_000_u64
        }))
        .unwrap();

        assert_eq!(user.id.as_deref(), Some("1"));
        assert_eq!(user.first_name.as_deref(), Some("Diego"));
        assert_eq!(user.last_name, None);
        assert_eq!(user.email, None);
    }

    #[test]
    fn idp_user_skips_absent_fields_when_serialized() {
        let user = IdpUser {
            username: Some("diegof".to_string()),
            enabled: Some(true),
            ..IdpUser::default()
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value, json!({ "username": "diegof", "enabled": true }));
    }
}
