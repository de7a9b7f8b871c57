//! Error types for the search controller
//!
//! Each layer owns its own error enum. Cancellation is deliberately absent:
//! a superseded request is reported through `FetchOutcome::Cancelled`,
//! never as an error value.

use std::path::PathBuf;

/// Errors raised by a `SearchApi` transport
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("server rejected the request: {message}")]
    Rejected { message: String },

    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors raised by persisted client-side storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{field} must be greater than zero")]
    ZeroCapacity { field: &'static str },
}

pub type ClientResult<T> = Result<T, ClientError>;
pub type StorageResult<T> = Result<T, StorageError>;

/// Raised by `SearchHandle` once the controller task has stopped
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("search controller has shut down")]
    Closed,
}
