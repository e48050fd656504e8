//! API Module
//!
//! HTTP handlers and routing through which the viewer, preload commands and
//! the purge command reach the document cache.
//!
//! # Endpoints
//! - `GET|PUT /cache?key=<url>` - Read or store a document
//! - `DELETE /cache` - Purge the cache
//! - `POST /preload` - Fetch and cache a document if absent
//! - `POST /prune` - Run an eviction pass
//! - `PUT /settings/cache-size` - Change the cache size
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{cors_layer, create_router};
