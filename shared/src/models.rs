use serde::{Deserialize, Serialize};

/// Outcome of a single scheduling attempt.
///
/// Remote failures are carried in-band rather than as an error type: the
/// caller always receives a message, either the join link or the error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EventResult {
    Created { join_link: String },
    Failed { error: String },
}

impl EventResult {
    pub fn join_link(&self) -> Option<&str> {
        match self {
            Self::Created { join_link } => Some(join_link),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    /// Text relayed to the HTTP caller as `msg`.
    pub fn message(&self) -> &str {
        match self {
            Self::Created { join_link } => join_link,
            Self::Failed { error } => error,
        }
    }
}

/// Whether a persisted credential exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    NoCredential,
    Authorized,
}

/// What a reset found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetOutcome {
    Deleted,
    NotPresent,
}

impl ResetOutcome {
    pub fn message(self) -> &'static str {
        match self {
            Self::Deleted => "File deleted successfully",
            Self::NotPresent => "File not exist",
        }
    }
}
