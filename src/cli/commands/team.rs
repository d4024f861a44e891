use clap::{Arg, Command};

pub const ARG_TEAM_URL: &str = "team-url";
pub const ARG_TEAM_TIMEOUT_SECONDS: &str = "team-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TEAM_URL)
                .long(ARG_TEAM_URL)
                .help("Team membership service base URL")
                .env("PORTERO_TEAM_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_TEAM_TIMEOUT_SECONDS)
                .long(ARG_TEAM_TIMEOUT_SECONDS)
                .help("Timeout for team membership lookups")
                .env("PORTERO_TEAM_TIMEOUT_SECONDS")
                .default_value("3")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
