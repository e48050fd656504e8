//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{CacheManager, PruneReport};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CacheSizeRequest, ClearResponse, HealthResponse, KeyQuery, PreloadRequest, PreloadResponse,
    SetResponse, SettingsResponse, StatsResponse,
};
use crate::settings::{BudgetSource, CacheSettings};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The document cache
    pub cache: Arc<CacheManager>,
    /// Live cache size setting the cache budgets against
    pub settings: Arc<CacheSettings>,
}

impl AppState {
    /// Creates a new AppState from a cache budgeted by `settings`.
    pub fn new(cache: CacheManager, settings: Arc<CacheSettings>) -> Self {
        Self {
            cache: Arc::new(cache),
            settings,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the durable store and the HTTP fetcher described by the Config.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let settings = Arc::new(CacheSettings::new(config.cache_size_mb));
        let cache = CacheManager::from_config(config, settings.clone()).await?;
        Ok(Self::new(cache, settings))
    }
}

/// Handler for GET /cache?key=<url>
///
/// Returns the cached document bytes, or 404 on a miss.
pub async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Response> {
    query.validate()?;

    match state.cache.get_cache(&query.key).await? {
        Some(bytes) => Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response()),
        None => Err(CacheError::NotFound(query.key)),
    }
}

/// Handler for PUT /cache?key=<url>
///
/// Caches the raw request body under the key.
pub async fn set_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
    body: Bytes,
) -> Result<Json<SetResponse>> {
    query.validate()?;

    let size = body.len();
    state.cache.set_cache(&query.key, body.to_vec()).await?;

    Ok(Json(SetResponse::new(query.key, size)))
}

/// Handler for DELETE /cache
///
/// Purges every cached document.
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    state.cache.clear().await?;
    Ok(Json(ClearResponse::purged()))
}

/// Handler for POST /preload
///
/// Fetches and caches a document unless a copy is already cached.
pub async fn preload_handler(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Result<Json<PreloadResponse>> {
    req.validate()?;

    let outcome = state.cache.preload(&req.key).await?;
    Ok(Json(PreloadResponse::new(req.key, outcome)))
}

/// Handler for POST /prune
pub async fn prune_handler(State(state): State<AppState>) -> Result<Json<PruneReport>> {
    Ok(Json(state.cache.prune().await?))
}

/// Handler for PUT /settings/cache-size
///
/// Applies a new cache size; it takes effect on the next prune.
pub async fn cache_size_handler(
    State(state): State<AppState>,
    Json(req): Json<CacheSizeRequest>,
) -> Json<SettingsResponse> {
    let megabytes = state.settings.set_cache_size_mb(req.megabytes);
    Json(SettingsResponse {
        megabytes,
        budget_bytes: state.settings.budget_bytes(),
    })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let usage = state.cache.usage().await?;
    let stats = state.cache.stats_snapshot();

    Ok(Json(StatsResponse::new(&stats, usage)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BLOB_PARTITION, META_PARTITION};
    use crate::error::PreloadError;
    use crate::fetch::{FetchedDocument, Fetcher};
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct StaticFetcher;

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> std::result::Result<FetchedDocument, PreloadError> {
            Ok(FetchedDocument {
                status: 200,
                body: b"%PDF-1.7".to_vec(),
            })
        }
    }

    fn test_state() -> AppState {
        let settings = Arc::new(CacheSettings::default());
        let store = Arc::new(MemoryStore::open("pdf-cache", &[BLOB_PARTITION, META_PARTITION]));
        let cache = CacheManager::new(store, settings.clone(), Arc::new(StaticFetcher));
        AppState::new(cache, settings)
    }

    fn key_query(key: &str) -> Query<KeyQuery> {
        Query(KeyQuery {
            key: key.to_string(),
        })
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let result = set_handler(
            State(state.clone()),
            key_query("https://example.com/a.pdf"),
            Bytes::from_static(b"document"),
        )
        .await;
        assert_eq!(result.unwrap().bytes, 8);

        let response = get_handler(State(state), key_query("https://example.com/a.pdf"))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let state = test_state();

        let result = get_handler(State(state), key_query("https://example.com/none.pdf")).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_preload_then_clear() {
        let state = test_state();

        let req = PreloadRequest {
            key: "https://example.com/b.pdf".to_string(),
        };
        let response = preload_handler(State(state.clone()), Json(req.clone()))
            .await
            .unwrap();
        assert_eq!(response.status, "fetched");

        let response = preload_handler(State(state.clone()), Json(req))
            .await
            .unwrap();
        assert_eq!(response.status, "cached");

        clear_handler(State(state.clone())).await.unwrap();
        let stats = stats_handler(State(state)).await.unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.fetches, 1);
    }

    #[tokio::test]
    async fn test_cache_size_handler_clamps() {
        let state = test_state();

        let response =
            cache_size_handler(State(state.clone()), Json(CacheSizeRequest { megabytes: 1 }))
                .await;
        assert_eq!(response.megabytes, 64);
        assert_eq!(response.budget_bytes, 64 * 1024 * 1024);
        assert_eq!(state.settings.cache_size_mb(), 64);
    }

    #[tokio::test]
    async fn test_set_invalid_key() {
        let state = test_state();

        let result = set_handler(State(state), key_query(""), Bytes::new()).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
