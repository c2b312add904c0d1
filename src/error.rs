//! Error types for objective lookups and status queries.

use thiserror::Error;

/// Errors returned by an [`ObjectivesApi`](crate::source::ObjectivesApi).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The backend reported that nothing exists for the selector.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or backend failure unrelated to the shape of the data.
    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Transport(format!("Parse error: {}", err))
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Transport(format!("Read error: {}", err))
    }
}
