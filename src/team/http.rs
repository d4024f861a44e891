use super::{Error, Result, TeamDirectory, TeamMembership};
use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const DEFAULT_TIMEOUT_SECONDS: u64 = 3;

/// Team Membership service client: `GET {base}/teams/user/{user_id}`.
///
/// Every request is bounded by `timeout`; dropping the returned future
/// cancels the request.
#[derive(Debug, Clone)]
pub struct HttpTeamDirectory {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTeamDirectory {
    /// # Errors
    /// Returns an error if the base URL cannot carry a path or the HTTP client cannot be built.
    pub fn new(base_url: Url) -> anyhow::Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(anyhow!(
                "Team service URL must be an absolute http(s) URL: {base_url}"
            ));
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("Failed to build team service HTTP client")?;

        Ok(Self {
            client,
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn teams_url(&self, user_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["teams", "user", user_id]);
        }
        url
    }
}

#[async_trait]
impl TeamDirectory for HttpTeamDirectory {
    #[instrument(skip(self))]
    async fn teams_by_user(&self, user_id: &str) -> Result<TeamMembership> {
        let url = self.teams_url(user_id);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| self.classify(err))?;

        if status.is_client_error() || status.is_server_error() {
            let reason = status
                .canonical_reason()
                .unwrap_or("unknown")
                .to_lowercase()
                .replace(' ', "_");

            return Err(Error::Status {
                status: status.as_u16(),
                reason,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let membership: TeamMembership = serde_json::from_slice(&body)?;

        debug!("user {} belongs to {} teams", user_id, membership.teams.len());

        Ok(membership)
    }
}

impl HttpTeamDirectory {
    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Transport(err)
        }
    }
}
