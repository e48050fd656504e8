//! PDF Cache - A byte-budgeted local document cache
//!
//! Keeps downloaded documents in a durable partitioned store so repeated
//! opens and shared preloads skip the network, evicting least-recently-used
//! documents to stay under a configurable size.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod settings;
pub mod store;

pub use api::AppState;
pub use cache::CacheManager;
pub use config::Config;
