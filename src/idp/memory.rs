//! In-process identity provider.
//!
//! Holds accounts, roles and issued tokens in memory and records every call,
//! so tests can assert which operations ran, in which order, and with which
//! bearer token. Individual operations can be forced to fail.

use super::{Error, IdentityProvider, IdpUser, Result, Role, TokenSet};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdpOperation {
    Login,
    Logout,
    IntrospectToken,
    ListUsers,
    FindUsersByUsername,
    GetUserById,
    GetRoleByName,
    CreateUser,
    DeleteUserById,
}

/// One recorded call: the operation, the bearer token it carried (if any)
/// and the username, id or role name it targeted (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpCall {
    pub operation: IdpOperation,
    pub bearer: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<IdpUser>,
    passwords: HashMap<String, String>,
    issued: HashMap<String, TokenSet>,
    roles: Vec<Role>,
    role_mappings: HashMap<String, Vec<String>>,
    active_tokens: HashSet<String>,
    failing: HashSet<IdpOperation>,
    calls: Vec<IdpCall>,
}

impl State {
    fn record(
        &mut self,
        operation: IdpOperation,
        bearer: Option<&str>,
        subject: Option<&str>,
    ) -> Result<()> {
        self.calls.push(IdpCall {
            operation,
            bearer: bearer.map(str::to_string),
            subject: subject.map(str::to_string),
        });

        if self.failing.contains(&operation) {
            return Err(Error::Status {
                status: 503,
                message: format!("{operation:?} unavailable"),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    state: Mutex<State>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a directory record. A missing id is filled with a fresh UUID.
    #[must_use]
    pub fn with_user(mut self, mut user: IdpUser) -> Self {
        if user.id.is_none() {
            user.id = Some(Uuid::new_v4().to_string());
        }
        self.state.get_mut().users.push(user);
        self
    }

    /// Register credentials and the token set a successful login returns.
    #[must_use]
    pub fn with_account(mut self, username: &str, password: &str, tokens: TokenSet) -> Self {
        {
            let state = self.state.get_mut();
            state
                .passwords
                .insert(username.to_string(), password.to_string());
            state.issued.insert(username.to_string(), tokens);
        }
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.state.get_mut().roles.push(role);
        self
    }

    /// Mark an access token as active for introspection.
    #[must_use]
    pub fn with_active_token(mut self, token: &str) -> Self {
        self.state
            .get_mut()
            .active_tokens
            .insert(token.to_string());
        self
    }

    /// Make every subsequent call of `operation` fail with a 503.
    #[must_use]
    pub fn failing(mut self, operation: IdpOperation) -> Self {
        self.state.get_mut().failing.insert(operation);
        self
    }

    pub async fn calls(&self) -> Vec<IdpCall> {
        self.state.lock().await.calls.clone()
    }

    /// Operations recorded so far, in call order.
    pub async fn operations(&self) -> Vec<IdpOperation> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .map(|call| call.operation)
            .collect()
    }

    pub async fn users(&self) -> Vec<IdpUser> {
        self.state.lock().await.users.clone()
    }

    /// Role names attached to the user with `id`.
    pub async fn roles_of(&self, id: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .role_mappings
            .get(id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn login(&self, username: &str, password: &SecretString) -> Result<TokenSet> {
        let mut state = self.state.lock().await;
        state.record(IdpOperation::Login, None, Some(username))?;

        let accepted = state
            .passwords
            .get(username)
            .is_some_and(|expected| expected == password.expose_secret());

        if !accepted {
            return Err(Error::Rejected {
                status: 401,
                message: "Invalid user credentials".to_string(),
            });
        }

        let tokens = state
            .issued
            .get(username)
            .cloned()
            .ok_or_else(|| Error::Decode(format!("no token set for {username}")))?;
        state.active_tokens.insert(tokens.access_token.clone());

        Ok(tokens)
    }

    async fn logout(&self, refresh_token: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(IdpOperation::Logout, None, None)?;

        let access_token = state
            .issued
            .values()
            .find(|tokens| tokens.refresh_token == refresh_token)
            .map(|tokens| tokens.access_token.clone())
            .ok_or_else(|| Error::Rejected {
                status: 400,
                message: "Invalid refresh token".to_string(),
            })?;

        state.active_tokens.remove(&access_token);
        Ok(())
    }

    async fn introspect_token(&self, access_token: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.record(IdpOperation::IntrospectToken, None, None)?;

        Ok(state.active_tokens.contains(access_token))
    }

    async fn list_users(&self, token: &str) -> Result<Vec<IdpUser>> {
        let mut state = self.state.lock().await;
        state.record(IdpOperation::ListUsers, Some(token), None)?;

        Ok(state.users.clone())
    }

    async fn find_users_by_username(&self, token: &str, username: &str) -> Result<Vec<IdpUser>> {
        let mut state = self.state.lock().await;
        state.record(IdpOperation::FindUsersByUsername, Some(token), Some(username))?;

        Ok(state
            .users
            .iter()
            .filter(|user| {
                user.username
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(username))
            })
            .cloned()
            .collect())
    }

    async fn get_user_by_id(&self, token: &str, id: &str) -> Result<IdpUser> {
        let mut state = self.state.lock().await;
        state.record(IdpOperation::GetUserById, Some(token), Some(id))?;

        state
            .users
            .iter()
            .find(|user| user.id.as_deref() == Some(id))
            .cloned()
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    async fn get_role_by_name(&self, token: &str, name: &str) -> Result<Role> {
        let mut state = self.state.lock().await;
        state.record(IdpOperation::GetRoleByName, Some(token), Some(name))?;

        state
            .roles
            .iter()
            .find(|role| role.name == name)
            .cloned()
            .ok_or_else(|| Error::NotFound("Could not find role".to_string()))
    }

    async fn create_user(&self, token: &str, role: &Role, user: &IdpUser) -> Result<String> {
        let mut state = self.state.lock().await;
        state.record(
            IdpOperation::CreateUser,
            Some(token),
            user.username.as_deref(),
        )?;

        let taken = state.users.iter().any(|existing| {
            existing.username.is_some() && existing.username.as_deref() == user.username.as_deref()
        });
        if taken {
            return Err(Error::Status {
                status: 409,
                message: "User exists with same username".to_string(),
            });
        }

        let id = Uuid::new_v4().to_string();
        let mut created = user.clone();
        created.id = Some(id.clone());
        state.users.push(created);
        state
            .role_mappings
            .entry(id.clone())
            .or_default()
            .push(role.name.clone());

        Ok(id)
    }

    async fn delete_user_by_id(&self, token: &str, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(IdpOperation::DeleteUserById, Some(token), Some(id))?;

        let before = state.users.len();
        state.users.retain(|user| user.id.as_deref() != Some(id));
        if state.users.len() == before {
            return Err(Error::NotFound("User not found".to_string()));
        }

        state.role_mappings.remove(id);
        Ok(())
    }
}
