//! Error types for chatline-store

use thiserror::Error;

/// Result type alias using chatline-store Error
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Failures reported by a driver (the underlying store)
#[derive(Error, Debug)]
pub enum DriverError {
    /// Filesystem or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other driver-specific failure
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the handle hierarchy
#[derive(Error, Debug)]
pub enum Error {
    /// No document with this id in the current collection
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The cluster could not be reached or the bucket never became ready
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Reading a single document failed
    #[error("Read failed: {0}")]
    ReadFailed(#[source] DriverError),

    /// Listing the collection failed
    #[error("Query failed: {0}")]
    QueryFailed(#[source] DriverError),

    /// Writing or removing a document failed
    #[error("Persist failed: {0}")]
    PersistFailed(#[source] DriverError),

    /// Closing the cluster connection failed; the handle is kept
    #[error("Failed to close cluster connection: {0}")]
    CloseFailed(#[source] DriverError),
}
