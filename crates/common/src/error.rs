//! Unified error type for the NASA data layer.

use thiserror::Error;

/// Every failure the data layer can surface.
///
/// `Clone` so that a single failed fetch can be handed to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No response reached us (DNS, TLS, socket, timeout).
    #[error("Network error: {0}")]
    Transport(String),

    /// The API answered with a non-2xx status.
    #[error("NASA API Error: {status} - {status_text}")]
    Remote { status: u16, status_text: String },

    /// A required parameter was missing or malformed; no request was issued.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the query layer should try again after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Remote { .. } | Error::Json(_)
        )
    }

    /// HTTP status for remote failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
