//! Error types for audit verification.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::matcher::MatchReport;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{var} must be set to run audit verification. {hint}")]
    MissingSetting { var: &'static str, hint: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("expected audit log [{}] to be a plain file but wasn't", .0.display())]
    NotAPlainFile(PathBuf),

    #[error("failed to read audit log [{}]: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized audit log line: {line}")]
    MalformedRecord {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid audit record ({reason}): {line}")]
    InvalidRecord { line: String, reason: String },

    #[error("unknown action [{0}]")]
    UnknownAction(String),

    #[error("unknown scenario [{0}]")]
    UnknownScenario(String),

    #[error("audit verification failed after {attempts} attempts in {elapsed:?}\n{report}")]
    VerificationFailed {
        attempts: u32,
        elapsed: Duration,
        report: Box<MatchReport>,
    },

    #[error(
        "a previous verification in this session had an audit-related failure; all subsequent \
         audit assertions are bogus because the log offsets can no longer be trusted"
    )]
    PriorFailure,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error comes from the log contents or the environment
    /// rather than from records failing to reconcile.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::VerificationFailed { .. } | Self::PriorFailure)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
