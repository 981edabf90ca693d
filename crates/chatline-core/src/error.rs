//! Error types for chatline-core

use thiserror::Error;

/// Result type alias using chatline-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the conversation services
#[derive(Error, Debug)]
pub enum Error {
    /// Nothing persisted under this name (API key, conversation id)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API key failed validation
    #[error("Invalid API key: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored conversation could not be decoded
    #[error("Failed to decode conversation {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] chatline_store::Error),

    /// The completion call failed or returned no candidate
    #[error("Completion failed: {0}")]
    CompletionFailed(#[source] chatline_ai::Error),
}

impl Error {
    /// Check if this error means the API key was rejected
    pub fn is_auth(&self) -> bool {
        match self {
            Error::CompletionFailed(e) => e.is_auth(),
            _ => false,
        }
    }
}
