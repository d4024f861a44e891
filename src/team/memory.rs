//! In-process team directory that records the user ids it was asked about.

use super::{Error, Result, Team, TeamDirectory, TeamMembership};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    memberships: HashMap<String, TeamMembership>,
    unavailable: bool,
    lookups: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryTeamDirectory {
    state: Mutex<State>,
}

impl MemoryTeamDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Users without an entry belong to no team.
    #[must_use]
    pub fn with_teams(mut self, user_id: &str, teams: Vec<Team>) -> Self {
        self.state
            .get_mut()
            .memberships
            .insert(user_id.to_string(), TeamMembership { teams });
        self
    }

    /// Make every lookup fail as if the service could not be reached.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.state.get_mut().unavailable = true;
        self
    }

    /// User ids looked up so far, in call order.
    pub async fn lookups(&self) -> Vec<String> {
        self.state.lock().await.lookups.clone()
    }
}

#[async_trait]
impl TeamDirectory for MemoryTeamDirectory {
    async fn teams_by_user(&self, user_id: &str) -> Result<TeamMembership> {
        let mut state = self.state.lock().await;
        state.lookups.push(user_id.to_string());

        if state.unavailable {
            return Err(Error::Unavailable("connection refused".to_string()));
        }

        Ok(state
            .memberships
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
