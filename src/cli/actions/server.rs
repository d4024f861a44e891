use crate::{
    api::{self, HttpMetrics},
    cli::telemetry,
    directory::UserDirectory,
    idp::keycloak::{KeycloakClient, KeycloakConfig},
    session::SessionManager,
    team::http::HttpTeamDirectory,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub cors_allow_origin: String,
    pub idp_url: Url,
    pub idp_realm: String,
    pub idp_client_id: String,
    pub idp_client_secret: SecretString,
    pub idp_timeout: Duration,
    pub default_role: String,
    pub team_url: Url,
    pub team_timeout: Duration,
}

/// Wire the collaborators and serve until a shutdown signal arrives.
/// # Errors
/// Returns an error if a client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let idp = Arc::new(KeycloakClient::new(
        KeycloakConfig::new(
            args.idp_url,
            args.idp_realm,
            args.idp_client_id,
            args.idp_client_secret,
        )
        .with_timeout(args.idp_timeout),
    )?);

    let teams = Arc::new(HttpTeamDirectory::new(args.team_url)?.with_timeout(args.team_timeout));

    let sessions = Arc::new(SessionManager::new(idp.clone()));
    let directory = Arc::new(UserDirectory::new(idp, teams, args.default_role));
    let http_metrics = Arc::new(HttpMetrics::new().context("Failed to register HTTP metrics")?);

    let result = api::new(
        args.port,
        sessions,
        directory,
        http_metrics,
        &args.cors_allow_origin,
    )
    .await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("idp_url", args.idp_url.to_string()),
        ("idp_realm", args.idp_realm.clone()),
        ("idp_client_id", args.idp_client_id.clone()),
        ("idp_timeout", format!("{:?}", args.idp_timeout)),
        ("default_role", args.default_role.clone()),
        ("team_url", args.team_url.to_string()),
        ("team_timeout", format!("{:?}", args.team_timeout)),
        ("cors_allow_origin", args.cors_allow_origin.clone()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "portero {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
