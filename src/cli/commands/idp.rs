use clap::{Arg, Command};

pub const ARG_IDP_URL: &str = "idp-url";
pub const ARG_IDP_REALM: &str = "idp-realm";
pub const ARG_IDP_CLIENT_ID: &str = "idp-client-id";
pub const ARG_IDP_CLIENT_SECRET: &str = "idp-client-secret";
pub const ARG_IDP_TIMEOUT_SECONDS: &str = "idp-timeout-seconds";
pub const ARG_DEFAULT_ROLE: &str = "default-role";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_IDP_URL)
                .long(ARG_IDP_URL)
                .help("Identity provider base URL, e.g. https://sso.example.com")
                .env("PORTERO_IDP_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_IDP_REALM)
                .long(ARG_IDP_REALM)
                .help("Realm holding the users and roles")
                .env("PORTERO_IDP_REALM")
                .required(true),
        )
        .arg(
            Arg::new(ARG_IDP_CLIENT_ID)
                .long(ARG_IDP_CLIENT_ID)
                .help("Client id used for the password grant and introspection")
                .env("PORTERO_IDP_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_IDP_CLIENT_SECRET)
                .long(ARG_IDP_CLIENT_SECRET)
                .help("Client secret")
                .env("PORTERO_IDP_CLIENT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_IDP_TIMEOUT_SECONDS)
                .long(ARG_IDP_TIMEOUT_SECONDS)
                .help("Timeout for identity provider requests")
                .env("PORTERO_IDP_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_DEFAULT_ROLE)
                .long(ARG_DEFAULT_ROLE)
                .help("Realm role attached to every created user")
                .env("PORTERO_DEFAULT_ROLE")
                .default_value("user"),
        )
}
