//! Keycloak-compatible REST client.
//!
//! OpenID Connect endpoints live under `{url}/realms/{realm}/protocol/openid-connect`
//! and are authenticated with the confidential client credentials. Admin
//! endpoints live under `{url}/admin/realms/{realm}` and are called with the
//! caller's bearer token, never with the client's own.

use super::{Error, IdentityProvider, IdpUser, Result, Role, TokenSet};
use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{header::LOCATION, Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const USERS_PAGE_SIZE: usize = 100;
const MAX_USERS_PAGES: usize = 1000;

#[derive(Clone)]
pub struct KeycloakConfig {
    base_url: Url,
    realm: String,
    client_id: String,
    client_secret: SecretString,
    timeout: Duration,
}

impl KeycloakConfig {
    #[must_use]
    pub fn new(base_url: Url, realm: String, client_id: String, client_secret: SecretString) -> Self {
        Self {
            base_url,
            realm,
            client_id,
            client_secret,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for KeycloakConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakConfig")
            .field("base_url", &self.base_url.as_str())
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
pub struct KeycloakClient {
    client: Client,
    config: KeycloakConfig,
}

#[derive(Deserialize)]
struct Introspection {
    active: Option<bool>,
}

impl KeycloakClient {
    /// Build a client for the configured realm.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot carry a path or the HTTP client cannot be built.
    pub fn new(config: KeycloakConfig) -> anyhow::Result<Self> {
        if config.base_url.cannot_be_a_base() {
            return Err(anyhow!(
                "Identity provider URL must be an absolute http(s) URL: {}",
                config.base_url
            ));
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to build identity provider HTTP client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.config.base_url.clone();
        // cannot_be_a_base() was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn openid_endpoint(&self, action: &[&str]) -> Url {
        let mut segments = vec![
            "realms",
            self.config.realm.as_str(),
            "protocol",
            "openid-connect",
        ];
        segments.extend_from_slice(action);
        self.endpoint(&segments)
    }

    fn admin_endpoint(&self, resource: &[&str]) -> Url {
        let mut segments = vec!["admin", "realms", self.config.realm.as_str()];
        segments.extend_from_slice(resource);
        self.endpoint(&segments)
    }

    fn client_form<'a>(&'a self, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
        ];
        form.extend_from_slice(extra);
        form
    }

    async fn fetch_users_page(&self, token: &str, first: usize) -> Result<Vec<IdpUser>> {
        let first = first.to_string();
        let max = USERS_PAGE_SIZE.to_string();
        let response = self
            .client
            .get(self.admin_endpoint(&["users"]))
            .bearer_auth(token)
            .query(&[("first", first.as_str()), ("max", max.as_str())])
            .send()
            .await?;

        decode_json(ensure_success(response).await?).await
    }

    // A page shorter than USERS_PAGE_SIZE (or empty) ends the listing.
    async fn fetch_all_users(&self, token: &str, max_pages: usize) -> Result<Vec<IdpUser>> {
        let mut users = Vec::new();

        for _ in 0..max_pages {
            let page = self.fetch_users_page(token, users.len()).await?;
            let last_page = page.len() < USERS_PAGE_SIZE;
            users.extend(page);

            if last_page {
                debug!("fetched {} users", users.len());
                return Ok(users);
            }
        }

        Err(Error::Decode(format!(
            "user listing did not end after {max_pages} pages"
        )))
    }
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    #[instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &SecretString) -> Result<TokenSet> {
        let form = self.client_form(&[
            ("grant_type", "password"),
            ("scope", "openid"),
            ("username", username),
            ("password", password.expose_secret()),
        ]);

        let response = self
            .client
            .post(self.openid_endpoint(&["token"]))
            .form(&form)
            .send()
            .await?;

        decode_json(ensure_success(response).await?).await
    }

    #[instrument(skip_all)]
    async fn logout(&self, refresh_token: &str) -> Result<()> {
        let form = self.client_form(&[("refresh_token", refresh_token)]);

        let response = self
            .client
            .post(self.openid_endpoint(&["logout"]))
            .form(&form)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn introspect_token(&self, access_token: &str) -> Result<bool> {
        let form = self.client_form(&[("token", access_token)]);

        let response = self
            .client
            .post(self.openid_endpoint(&["token", "introspect"]))
            .form(&form)
            .send()
            .await?;

        let introspection: Introspection = decode_json(ensure_success(response).await?).await?;

        introspection
            .active
            .ok_or_else(|| Error::Decode("introspection response has no active flag".to_string()))
    }

    #[instrument(skip(self, token))]
    async fn list_users(&self, token: &str) -> Result<Vec<IdpUser>> {
        self.fetch_all_users(token, MAX_USERS_PAGES).await
    }

    #[instrument(skip(self, token))]
    async fn find_users_by_username(&self, token: &str, username: &str) -> Result<Vec<IdpUser>> {
        let response = self
            .client
            .get(self.admin_endpoint(&["users"]))
            .bearer_auth(token)
            .query(&[("username", username), ("exact", "true")])
            .send()
            .await?;

        decode_json(ensure_success(response).await?).await
    }

    #[instrument(skip(self, token))]
    async fn get_user_by_id(&self, token: &str, id: &str) -> Result<IdpUser> {
        let response = self
            .client
            .get(self.admin_endpoint(&["users", id]))
            .bearer_auth(token)
            .send()
            .await?;

        decode_json(ensure_success(response).await?).await
    }

    #[instrument(skip(self, token))]
    async fn get_role_by_name(&self, token: &str, name: &str) -> Result<Role> {
        let response = self
            .client
            .get(self.admin_endpoint(&["roles", name]))
            .bearer_auth(token)
            .send()
            .await?;

        decode_json(ensure_success(response).await?).await
    }

    #[instrument(skip(self, token, user), fields(username = ?user.username))]
    async fn create_user(&self, token: &str, role: &Role, user: &IdpUser) -> Result<String> {
        let response = self
            .client
            .post(self.admin_endpoint(&["users"]))
            .bearer_auth(token)
            .json(user)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let id = created_id(&response)?;

        let mapping = self
            .client
            .post(self.admin_endpoint(&["users", &id, "role-mappings", "realm"]))
            .bearer_auth(token)
            .json(&[role])
            .send()
            .await;

        let mapped = match mapping {
            Ok(response) => ensure_success(response).await.map(|_| ()),
            Err(err) => Err(Error::from(err)),
        };

        if let Err(err) = mapped {
            // Leave no account behind without its role.
            warn!("Failed to assign role {} to user {}: {}", role.name, id, err);
            if let Err(cleanup) = self.delete_user_by_id(token, &id).await {
                warn!("Failed to remove user {} after role assignment error: {}", id, cleanup);
            }
            return Err(err);
        }

        Ok(id)
    }

    #[instrument(skip(self, token))]
    async fn delete_user_by_id(&self, token: &str, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.admin_endpoint(&["users", id]))
            .bearer_auth(token)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

/// Pass successful responses through, turn everything else into an [`Error`].
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    debug!("identity provider returned {}: {}", status, message);

    Err(match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Rejected {
                status: status.as_u16(),
                message,
            }
        }
        StatusCode::NOT_FOUND => Error::NotFound(message),
        _ => Error::Status {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| Error::Decode(err.to_string()))
}

/// Keycloak answers `201 Created` with the new resource in `Location`.
fn created_id(response: &Response) -> Result<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Decode("created user has no Location header".to_string()))
}

/// Pick the most descriptive message out of a Keycloak error body.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    ["error_description", "errorMessage", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map_or_else(|| body.trim().to_string(), str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REALM: &str = "cow";

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client_for(server: &MockServer) -> KeycloakClient {
        let config = KeycloakConfig::new(
            Url::parse(&server.uri()).unwrap(),
            REALM.to_string(),
            "portero".to_string(),
            SecretString::from("s3cret".to_string()),
        )
        .with_timeout(Duration::from_secs(2));
        KeycloakClient::new(config).unwrap()
    }

    fn user_json(id: &str, username: &str) -> Value {
        json!({
            "id": id,
            "username": username,
            "firstName": "Diego",
            "lastName": "Fernandez",
            "email": format!("{username}@example.com"),
            "enabled": true
        })
    }

    #[test]
    fn error_message_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#;
        assert_eq!(error_message(body), "Invalid user credentials");
        assert_eq!(
            error_message(r#"{"errorMessage":"User exists with same username"}"#),
            "User exists with same username"
        );
        assert_eq!(error_message("upstream down"), "upstream down");
    }

    #[test]
    fn endpoints_keep_base_path_and_encode_segments() {
        let config = KeycloakConfig::new(
            Url::parse("https://sso.example.com/auth/").unwrap(),
            "my realm".to_string(),
            "portero".to_string(),
            SecretString::from("s3cret".to_string()),
        );
        let client = KeycloakClient::new(config).unwrap();

        assert_eq!(
            client.openid_endpoint(&["token"]).as_str(),
            "https://sso.example.com/auth/realms/my%20realm/protocol/openid-connect/token"
        );
        assert_eq!(
            client.admin_endpoint(&["users", "42"]).as_str(),
            "https://sso.example.com/auth/admin/realms/my%20realm/users/42"
        );
    }

    #[test]
    fn debug_hides_client_secret() {
        let config = KeycloakConfig::new(
            Url::parse("https://sso.example.com").unwrap(),
            REALM.to_string(),
            "portero".to_string(),
            SecretString::from("s3cret".to_string()),
        );
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn rejects_urls_without_base() {
        let config = KeycloakConfig::new(
            Url::parse("mailto:sso@example.com").unwrap(),
            REALM.to_string(),
            "portero".to_string(),
            SecretString::from("s3cret".to_string()),
        );
        assert!(KeycloakClient::new(config).is_err());
    }

    #[tokio::test]
    async fn login_returns_token_set() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/realms/cow/protocol/openid-connect/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=diego"))
            .and(body_string_contains("client_secret=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "expires_in": 3600,
                "refresh_token": "rtok",
                "refresh_expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = client_for(&server)
            .login("diego", &SecretString::from("x".to_string()))
            .await
            .unwrap();

        assert_eq!(
            tokens,
            TokenSet {
                access_token: "tok".to_string(),
                expires_in: 3600,
                refresh_token: "rtok".to_string(),
                refresh_expires_in: 3600,
            }
        );
    }

    #[tokio::test]
    async fn login_with_bad_credentials_is_rejected() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/realms/cow/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid user credentials"
            })))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .login("diego", &SecretString::from("wrong".to_string()))
            .await;

        match result {
            Err(Error::Rejected { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid user credentials");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn introspection_reports_active_flag() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/realms/cow/protocol/openid-connect/token/introspect"))
            .and(body_string_contains("token=live"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "active": true })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/realms/cow/protocol/openid-connect/token/introspect"))
            .and(body_string_contains("token=stale"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "active": false })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.introspect_token("live").await.unwrap());
        assert!(!client.introspect_token("stale").await.unwrap());
    }

    #[tokio::test]
    async fn introspection_without_active_flag_is_an_error() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/realms/cow/protocol/openid-connect/token/introspect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let result = client_for(&server).introspect_token("tok").await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn logout_posts_refresh_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/realms/cow/protocol/openid-connect/logout"))
            .and(body_string_contains("refresh_token=rtok"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).logout("rtok").await.unwrap();
    }

    #[tokio::test]
    async fn list_users_forwards_bearer_and_pages() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        let full_page: Vec<Value> = (0..USERS_PAGE_SIZE)
            .map(|i| user_json(&i.to_string(), &format!("user{i}")))
            .collect();

        Mock::given(method("GET"))
            .and(path("/admin/realms/cow/users"))
            .and(header("Authorization", "Bearer caller-token"))
            .and(query_param("first", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/admin/realms/cow/users"))
            .and(header("Authorization", "Bearer caller-token"))
            .and(query_param("first", "100"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([user_json("x", "last")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let users = client_for(&server).list_users("caller-token").await.unwrap();
        assert_eq!(users.len(), USERS_PAGE_SIZE + 1);
        assert_eq!(users.last().and_then(|u| u.username.as_deref()), Some("last"));
    }

    #[tokio::test]
    async fn list_users_stops_on_empty_page() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        let full_page: Vec<Value> = (0..USERS_PAGE_SIZE)
            .map(|i| user_json(&i.to_string(), &format!("user{i}")))
            .collect();

        Mock::given(method("GET"))
            .and(path("/admin/realms/cow/users"))
            .and(query_param("first", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/admin/realms/cow/users"))
            .and(query_param("first", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let users = client_for(&server).list_users("tok").await.unwrap();
        assert_eq!(users.len(), USERS_PAGE_SIZE);
    }

    #[tokio::test]
    async fn list_users_gives_up_when_pages_never_shrink() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        let full_page: Vec<Value> = (0..USERS_PAGE_SIZE)
            .map(|i| user_json(&i.to_string(), &format!("user{i}")))
            .collect();

        // ignores `first` and `max`
        Mock::given(method("GET"))
            .and(path("/admin/realms/cow/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
            .expect(3)
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_all_users("tok", 3).await;
        match result {
            Err(Error::Decode(message)) => assert!(message.contains("3 pages")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_users_by_username_requests_exact_match() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/realms/cow/users"))
            .and(query_param("username", "diegof"))
            .and(query_param("exact", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([user_json("1", "diegof")])),
            )
            .mount(&server)
            .await;

        let users = client_for(&server)
            .find_users_by_username("tok", "diegof")
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn get_user_by_id_maps_missing_user() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/realms/cow/users/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json("1", "diegof")))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/admin/realms/cow/users/2"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": "User not found" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let user = client.get_user_by_id("tok", "1").await.unwrap();
        assert_eq!(user.username.as_deref(), Some("diegof"));

        let missing = client.get_user_by_id("tok", "2").await;
        assert!(matches!(missing, Err(Error::NotFound(message)) if message == "User not found"));
    }

    #[tokio::test]
    async fn create_user_assigns_role_to_new_id() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/realms/cow/users"))
            .and(header("Authorization", "Bearer tok"))
            .and(body_json(json!({
                "username": "diegof",
                "firstName": "Diego",
                "lastName": "Fernandez",
                "email": "diegof@example.com",
                "enabled": true
            })))
            .respond_with(ResponseTemplate::new(201).insert_header(
                "Location",
                format!("{}/admin/realms/cow/users/new-id", server.uri()).as_str(),
            ))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/admin/realms/cow/users/new-id/role-mappings/realm"))
            .and(body_json(json!([{ "id": "role-1", "name": "user" }])))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let role = Role {
            id: "role-1".to_string(),
            name: "user".to_string(),
        };
        let user = IdpUser {
            username: Some("diegof".to_string()),
            first_name: Some("Diego".to_string()),
            last_name: Some("Fernandez".to_string()),
            email: Some("diegof@example.com".to_string()),
            enabled: Some(true),
            ..IdpUser::default()
        };

        let id = client_for(&server)
            .create_user("tok", &role, &user)
            .await
            .unwrap();
        assert_eq!(id, "new-id");
    }

    #[tokio::test]
    async fn create_user_removes_account_when_role_assignment_fails() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/realms/cow/users"))
            .respond_with(ResponseTemplate::new(201).insert_header(
                "Location",
                format!("{}/admin/realms/cow/users/new-id", server.uri()).as_str(),
            ))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/admin/realms/cow/users/new-id/role-mappings/realm"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/admin/realms/cow/users/new-id"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let role = Role {
            id: "role-1".to_string(),
            name: "user".to_string(),
        };
        let result = client_for(&server)
            .create_user("tok", &role, &IdpUser::default())
            .await;

        assert!(matches!(result, Err(Error::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn duplicate_user_is_reported_with_provider_message() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/realms/cow/users"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "errorMessage": "User exists with same username"
            })))
            .mount(&server)
            .await;

        let role = Role {
            id: "role-1".to_string(),
            name: "user".to_string(),
        };
        let err = client_for(&server)
            .create_user("tok", &role, &IdpUser::default())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "identity provider returned 409: User exists with same username"
        );
    }

    #[tokio::test]
    async fn delete_user_by_id_sends_delete() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/admin/realms/cow/users/1"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_user_by_id("tok", "1").await.unwrap();
    }

    #[tokio::test]
    async fn get_role_by_name_decodes_role() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/realms/cow/roles/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "role-1",
                "name": "user",
                "composite": false,
                "clientRole": false
            })))
            .mount(&server)
            .await;

        let role = client_for(&server).get_role_by_name("tok", "user").await.unwrap();
        assert_eq!(role.id, "role-1");
    }
}
