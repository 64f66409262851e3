use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Failures surfaced by a [`crate::CloudClient`].
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("quota exceeded: {0}")]
    Quota(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::NotFound(_) => ErrorKind::NotFound,
            ClientError::Quota(_) => ErrorKind::Quota,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// A policy value that could not be interpreted.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid duration '{input}': {reason}")]
    Duration { input: String, reason: String },

    #[error("invalid snapshot count '{input}': {reason}")]
    Count { input: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Coarse error class, as it appears in logs and run reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    NotFound,
    Quota,
    Format,
}
