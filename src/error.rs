//! Error types for the document cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Errors raised by a transactional store engine.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Non-forced write against a key that already exists
    #[error("key exists: {key} in partition {partition}")]
    KeyExists { partition: String, key: String },

    /// Partition was not declared when the store was opened
    #[error("unknown partition: {0}")]
    UnknownPartition(String),

    /// On-disk schema is newer than the requested one
    #[error("store version conflict: found {found}, requested {requested}")]
    VersionConflict { found: u32, requested: u32 },

    /// The engine could not be opened
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transaction-level I/O failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be encoded or decoded
    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

// == Preload Error Enum ==
/// Errors raised while fetching a document for the cache.
#[derive(Error, Debug)]
pub enum PreloadError {
    /// The remote answered with a non-success status
    #[error("fetch of {key} failed with status {status}")]
    Status { key: String, status: u16 },

    /// The remote answered OK with an empty body
    #[error("fetch of {0} returned an empty body")]
    EmptyBody(String),

    /// The remote document exceeds the accepted size
    #[error("fetch of {key} exceeds the {limit} byte document limit")]
    TooLarge { key: String, limit: usize },

    /// Transport-level failure
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

// == Cache Error Enum ==
/// Unified error type for the cache manager and its HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in the cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Document fetch failure
    #[error(transparent)]
    Preload(#[from] PreloadError),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Store(StoreError::KeyExists { .. }) => StatusCode::CONFLICT,
            CacheError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::Preload(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
