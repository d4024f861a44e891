//! User directory orchestration.
//!
//! Reads and writes go straight to the identity provider with the caller's
//! bearer token. Deletion is guarded by the team membership service: a user
//! that still belongs to any team is never removed.

use crate::{
    idp::{IdentityProvider, IdpUser},
    team::TeamDirectory,
    Error,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

/// Canonical user shape returned to callers.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: String,
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub nick_name: String,
}

impl TryFrom<IdpUser> for DirectoryUser {
    type Error = Error;

    fn try_from(user: IdpUser) -> Result<Self, Self::Error> {
        let label = user
            .username
            .clone()
            .or_else(|| user.id.clone())
            .unwrap_or_else(|| "<unknown>".to_string());

        let required = |value: Option<String>, field: &'static str| {
            value.ok_or_else(|| Error::IncompleteRecord {
                user: label.clone(),
                field,
            })
        };

        Ok(Self {
            id: required(user.id, "id")?,
            nick_name: required(user.username, "username")?,
            name: required(user.first_name, "first name")?,
            last_name: required(user.last_name, "last name")?,
            email: required(user.email, "email")?,
        })
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewUserRequest {
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub nick_name: String,
}

impl NewUserRequest {
    /// # Errors
    /// Returns [`Error::Validation`] naming the first empty field, or when the email is malformed.
    pub fn validate(&self) -> Result<(), Error> {
        let fields = [
            ("name", &self.name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("nick_name", &self.nick_name),
        ];

        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{field} is required")));
            }
        }

        if !valid_email(self.email.trim()) {
            return Err(Error::Validation(format!("invalid email {}", self.email)));
        }

        Ok(())
    }

    /// Nickname as it is stored in the identity provider.
    #[must_use]
    pub fn username(&self) -> &str {
        self.nick_name.trim()
    }

    fn to_idp_user(&self) -> IdpUser {
        IdpUser {
            id: None,
            username: Some(self.username().to_string()),
            first_name: Some(self.name.trim().to_string()),
            last_name: Some(self.last_name.trim().to_string()),
            email: Some(self.email.trim().to_string()),
            enabled: Some(true),
        }
    }
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

pub struct UserDirectory {
    idp: Arc<dyn IdentityProvider>,
    teams: Arc<dyn TeamDirectory>,
    role_name: String,
}

impl UserDirectory {
    #[must_use]
    pub fn new(
        idp: Arc<dyn IdentityProvider>,
        teams: Arc<dyn TeamDirectory>,
        role_name: impl Into<String>,
    ) -> Self {
        Self {
            idp,
            teams,
            role_name: role_name.into(),
        }
    }

    /// Every user in the directory. One unmappable record fails the whole call.
    ///
    /// # Errors
    /// Returns an upstream error if the listing fails, or an incomplete-record error.
    #[instrument(skip_all)]
    pub async fn get_all(&self, token: &str) -> Result<Vec<DirectoryUser>, Error> {
        let users = self
            .idp
            .list_users(token)
            .await
            .map_err(|err| Error::idp("list users", err))?;

        users.into_iter().map(DirectoryUser::try_from).collect()
    }

    /// # Errors
    /// [`Error::NotFound`] with no match, [`Error::Ambiguous`] with more than one.
    #[instrument(skip(self, token))]
    pub async fn get_by_nickname(&self, token: &str, nickname: &str) -> Result<DirectoryUser, Error> {
        self.lookup(token, nickname)
            .await
            .and_then(DirectoryUser::try_from)
    }

    /// Create the user with the configured role and return the new id.
    ///
    /// The role is resolved first; if that fails nothing is created.
    ///
    /// # Errors
    /// Returns a validation error for a bad request, or an upstream error.
    #[instrument(skip(self, token, request), fields(nick_name = %request.username()))]
    pub async fn create(&self, token: &str, request: &NewUserRequest) -> Result<String, Error> {
        request.validate()?;

        let role = self
            .idp
            .get_role_by_name(token, &self.role_name)
            .await
            .map_err(|err| Error::idp(format!("get role {}", self.role_name), err))?;

        let id = self
            .idp
            .create_user(token, &role, &request.to_idp_user())
            .await
            .map_err(|err| Error::idp(format!("create user {}", request.username()), err))?;

        info!("user {} created with id {}", request.username(), id);

        Ok(id)
    }

    /// Remove a user that belongs to no team and return its username.
    ///
    /// Membership is checked on every call; a non-empty list stops the
    /// deletion before the identity provider is touched.
    ///
    /// # Errors
    /// [`Error::NotFound`], [`Error::HasTeams`], or an upstream error from either service.
    #[instrument(skip(self, token))]
    pub async fn delete(&self, token: &str, nickname: &str) -> Result<String, Error> {
        let user = self.lookup(token, nickname).await?;

        let id = user.id.ok_or_else(|| Error::IncompleteRecord {
            user: nickname.to_string(),
            field: "id",
        })?;
        let username = user.username.unwrap_or_else(|| nickname.to_string());

        let membership = self
            .teams
            .teams_by_user(&id)
            .await
            .map_err(|err| Error::team(format!("check teams of user {id}"), err))?;

        if !membership.is_empty() {
            debug!("user {} belongs to {} teams", username, membership.teams.len());
            return Err(Error::HasTeams(nickname.to_string()));
        }

        self.idp
            .delete_user_by_id(token, &id)
            .await
            .map_err(|err| Error::idp(format!("delete user {username}"), err))?;

        info!("user {} deleted", username);

        Ok(username)
    }

    async fn lookup(&self, token: &str, nickname: &str) -> Result<IdpUser, Error> {
        let found = self
            .idp
            .find_users_by_username(token, nickname)
            .await
            .map_err(|err| Error::idp(format!("find user {nickname}"), err))?;

        let mut matches = found.into_iter().filter(|user| {
            user.username
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(nickname))
        });

        match (matches.next(), matches.next()) {
            (Some(user), None) => Ok(user),
            (None, _) => Err(Error::NotFound(nickname.to_string())),
            (Some(_), Some(_)) => Err(Error::Ambiguous(nickname.to_string())),
        }
    }
}
