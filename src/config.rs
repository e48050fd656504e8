//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::settings::{clamp_cache_size_mb, DEFAULT_CACHE_SIZE_MB};

/// Cache server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the durable store lives under
    pub cache_dir: PathBuf,
    /// Name of the store inside `cache_dir`
    pub store_name: String,
    /// Cache size in megabytes, clamped to the accepted range
    pub cache_size_mb: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Timeout in seconds for document fetches
    pub fetch_timeout: u64,
    /// Browser origin of the viewer allowed to call the API cross-origin
    pub cors_origin: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Store root directory (default: .pdf-cache)
    /// - `CACHE_STORE_NAME` - Store name (default: pdf-cache)
    /// - `CACHE_SIZE_MB` - Cache size in megabytes, clamped to 64..=1024 (default: 256)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `FETCH_TIMEOUT` - Document fetch timeout in seconds (default: 30)
    /// - `CORS_ORIGIN` - Viewer origin allowed cross-origin access (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            store_name: env::var("CACHE_STORE_NAME")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.store_name),
            cache_size_mb: env::var("CACHE_SIZE_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(clamp_cache_size_mb)
                .unwrap_or(defaults.cache_size_mb),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            fetch_timeout: env::var("FETCH_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_timeout),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".pdf-cache"),
            store_name: "pdf-cache".to_string(),
            cache_size_mb: DEFAULT_CACHE_SIZE_MB,
            server_port: 3000,
            fetch_timeout: 30,
            cors_origin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_dir, PathBuf::from(".pdf-cache"));
        assert_eq!(config.store_name, "pdf-cache");
        assert_eq!(config.cors_origin, None);

        env::set_var("CORS_ORIGIN", "http://localhost:30000");
        assert_eq!(
            Config::from_env().cors_origin.as_deref(),
            Some("http://localhost:30000")
        );
        env::remove_var("CORS_ORIGIN");
        assert_eq!(config.cache_size_mb, 256);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.fetch_timeout, 30);
        assert_eq!(config.cors_origin, None);
    }

    // One test touches the environment so parallel tests cannot race on it.
    #[test]
    fn test_config_from_env() {
        env::remove_var("CACHE_DIR");
        env::remove_var("CACHE_STORE_NAME");
        env::remove_var("SERVER_PORT");
        env::remove_var("FETCH_TIMEOUT");
        env::remove_var("CACHE_SIZE_MB");
        env::remove_var("CORS_ORIGIN");

        let config = Config::from_env();
        assert_eq!(config.cache_size_mb, 256);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.store_name, "pdf-cache");

        env::set_var("CACHE_SIZE_MB", "8");
        assert_eq!(Config::from_env().cache_size_mb, 64);

        env::set_var("CACHE_SIZE_MB", "100000");
        assert_eq!(Config::from_env().cache_size_mb, 1024);

        env::set_var("CACHE_SIZE_MB", "not-a-number");
        assert_eq!(Config::from_env().cache_size_mb, 256);

        env::remove_var("CACHE_SIZE_MB");
    }
}
