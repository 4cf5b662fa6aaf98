//! Error taxonomy for the export run.
//!
//! Auth and discovery failures abort the whole run. Export failures are
//! scoped to one account; transient ones are retried before they degrade to
//! permanent. Normalization never errors, it degrades to warnings.

use thiserror::Error;

/// Fatal authentication failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("login rejected: user id / PIN combination refused")]
    InvalidCredentials,
    #[error("login confirmation was rejected in the app")]
    ChallengeRejected,
    #[error("timed out waiting for login confirmation")]
    ChallengeTimeout,
    #[error("transport failure during login: {0}")]
    Transport(String),
    #[error("the bank invalidated the session mid-run")]
    SessionExpired,
    #[error("interrupted while waiting for login confirmation")]
    Interrupted,
}

/// Fatal failures while enumerating accounts; with no targets, the run
/// cannot proceed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("account overview parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Per-account export failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExportError {
    /// Network-level or server-side trouble; worth retrying.
    #[error("transient export failure: {0}")]
    Transient(String),
    /// Retrying cannot fix this; the account is skipped.
    #[error("permanent export failure: {0}")]
    Permanent(String),
    /// The session died under us; fatal for the remaining run.
    #[error("the bank invalidated the session mid-run")]
    SessionExpired,
}
