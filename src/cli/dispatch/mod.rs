use crate::cli::{
    actions::{server::Args, Action},
    commands::{idp, team, ARG_CORS_ALLOW_ORIGIN, ARG_PORT},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

fn url(matches: &clap::ArgMatches, name: &str) -> Result<Url> {
    let value = required(matches, name)?;
    Url::parse(&value).with_context(|| format!("invalid --{name}: {value}"))
}

/// # Errors
/// Returns an error if required arguments are missing or a URL does not parse.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let cors_allow_origin = matches
        .get_one::<String>(ARG_CORS_ALLOW_ORIGIN)
        .cloned()
        .unwrap_or_else(|| "*".to_string());

    let idp_url = url(matches, idp::ARG_IDP_URL)?;
    let idp_realm = required(matches, idp::ARG_IDP_REALM)?;
    let idp_client_id = required(matches, idp::ARG_IDP_CLIENT_ID)?;
    let idp_client_secret = SecretString::from(required(matches, idp::ARG_IDP_CLIENT_SECRET)?);
    let idp_timeout = Duration::from_secs(
        matches
            .get_one::<u64>(idp::ARG_IDP_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(10),
    );
    let default_role = matches
        .get_one::<String>(idp::ARG_DEFAULT_ROLE)
        .cloned()
        .unwrap_or_else(|| "user".to_string());

    let team_url = url(matches, team::ARG_TEAM_URL)?;
    let team_timeout = Duration::from_secs(
        matches
            .get_one::<u64>(team::ARG_TEAM_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(3),
    );

    Ok(Action::Server(Args {
        port,
        cors_allow_origin,
        idp_url,
        idp_realm,
        idp_client_id,
        idp_client_secret,
        idp_timeout,
        default_role,
        team_url,
        team_timeout,
    }))
}
