//! Error types for trail-climate

use std::sync::Arc;
use thiserror::Error;

/// Main error type for trail-climate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Upstream timed out after {0} ms")]
    Timeout(u64),

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Request superseded: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    /// An error produced once and handed to every waiter of a shared request
    #[error("{0}")]
    Shared(Arc<Error>),
}

impl Error {
    /// Unwrap shared errors down to the error that was originally produced
    pub fn root(&self) -> &Error {
        match self {
            Error::Shared(inner) => inner.root(),
            other => other,
        }
    }
}

/// Result type alias for trail-climate operations
pub type Result<T> = std::result::Result<T, Error>;
