//! Team Membership contract.
//!
//! The directory asks this service which teams a user belongs to before it
//! deletes the account. Only an empty list allows the deletion.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("team membership request timed out after {0:?}")]
    Timeout(Duration),

    #[error("team membership request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success answer, rendered as `<status> <snake_case reason>: <body>`.
    #[error("{status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("error unmarshal teams by user: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("team membership service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub code: String,
    pub debt: i64,
}

/// Teams a user belongs to. A missing or `null` list reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub teams: Vec<Team>,
}

impl TeamMembership {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Team>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Team>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[async_trait]
pub trait TeamDirectory: Send + Sync {
    async fn teams_by_user(&self, user_id: &str) -> Result<TeamMembership>;
}
