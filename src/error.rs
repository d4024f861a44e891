//! Error type shared by the session and directory orchestrators.
//!
//! Every variant belongs to one [`ErrorKind`]; the HTTP boundary decides the
//! status code from the variant and renders the `Display` text as the message.

use crate::{idp, team};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    NotFound,
    Conflict,
    Upstream,
}

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input, e.g. an empty nickname or an invalid email.
    #[error("{0}")]
    Validation(String),

    /// The IdP returned a user record without a field the directory requires.
    #[error("user record {user} is missing {field}")]
    IncompleteRecord { user: String, field: &'static str },

    #[error("user or password incorrect")]
    InvalidCredentials,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("user {0} doesn't exist")]
    NotFound(String),

    #[error("user {0} matches more than one account")]
    Ambiguous(String),

    #[error("user {0} has teams")]
    HasTeams(String),

    #[error("{operation}: {source}")]
    Idp {
        operation: String,
        #[source]
        source: idp::Error,
    },

    #[error("{operation}: {source}")]
    Team {
        operation: String,
        #[source]
        source: team::Error,
    },
}

impl Error {
    pub(crate) fn idp(operation: impl Into<String>, source: idp::Error) -> Self {
        Self::Idp {
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn team(operation: impl Into<String>, source: team::Error) -> Self {
        Self::Team {
            operation: operation.into(),
            source,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::IncompleteRecord { .. } => ErrorKind::Validation,
            Self::InvalidCredentials | Self::InvalidRefreshToken => ErrorKind::Authentication,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::HasTeams(_) => ErrorKind::Conflict,
            Self::Ambiguous(_) | Self::Idp { .. } | Self::Team { .. } => ErrorKind::Upstream,
        }
    }
}
