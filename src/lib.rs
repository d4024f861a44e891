//! # Portero (Identity Gateway)
//!
//! `portero` sits between client applications and an external Identity
//! Provider (a Keycloak-compatible IdP). It exposes a small REST surface to
//! log users in and out, validate bearer tokens, and manage the user
//! directory, while the IdP remains the system of record for credentials and
//! accounts.
//!
//! ## Session lifecycle
//!
//! Sessions are never stored here. `POST /auth/login` exchanges credentials
//! for the IdP token pair and hands it back verbatim; logout and token
//! validation forward the caller's token to the IdP on every call.
//!
//! ## User directory
//!
//! Directory reads always resolve against the IdP. Creation attaches the
//! configured realm role. Deletion is guarded: the Team Membership service is
//! consulted first and a user that still belongs to any team is never deleted.
//!
//! ## Layout
//!
//! - [`idp`] and [`team`]: collaborator traits, HTTP clients and in-memory doubles.
//! - [`session`] and [`directory`]: the orchestration core.
//! - [`api`]: axum boundary, metrics and `OpenAPI`.
//! - [`cli`]: configuration, telemetry and the server action.

pub mod api;
pub mod cli;
pub mod directory;
pub mod error;
pub mod idp;
pub mod session;
pub mod team;

pub use self::error::{Error, ErrorKind};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
