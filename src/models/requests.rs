//! Request DTOs for the cache HTTP API
//!
//! Defines the structure of incoming query strings and request bodies.

use serde::Deserialize;

use crate::cache::{validate_document_url, validate_key};
use crate::error::Result;

/// Query string naming a document (`?key=<url>`)
#[derive(Debug, Clone, Deserialize)]
pub struct KeyQuery {
    /// The document key, in practice its absolute URL
    pub key: String,
}

impl KeyQuery {
    /// Validates the request data.
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.key)
    }
}

/// Request body for POST /preload
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadRequest {
    /// URL of the document to cache
    pub key: String,
}

impl PreloadRequest {
    /// Validates the request data; the key must be an http(s) URL.
    pub fn validate(&self) -> Result<()> {
        validate_document_url(&self.key)
    }
}

/// Request body for PUT /settings/cache-size
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSizeRequest {
    /// Requested cache size; clamped before it is applied
    pub megabytes: u64,
}
