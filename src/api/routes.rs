//! API Routes
//!
//! Configures the Axum router with all cache endpoints.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_size_handler, clear_handler, get_handler, health_handler, preload_handler,
    prune_handler, set_handler, stats_handler, AppState,
};
use crate::cache::MAX_DOCUMENT_SIZE;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /cache?key=<url>` - Read a cached document
/// - `PUT /cache?key=<url>` - Cache the request body
/// - `DELETE /cache` - Purge the cache
/// - `POST /preload` - Fetch and cache a document if absent
/// - `POST /prune` - Run an eviction pass
/// - `PUT /settings/cache-size` - Change the cache size
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - Body limit raised to the largest accepted document
/// - CORS: Only `allowed_origin` may read responses cross-origin; with
///   `None` no cross-origin access is granted
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState, allowed_origin: Option<HeaderValue>) -> Router {
    let cors = cors_layer(allowed_origin);

    Router::new()
        .route(
            "/cache",
            get(get_handler).put(set_handler).delete(clear_handler),
        )
        .route("/preload", post(preload_handler))
        .route("/prune", post(prune_handler))
        .route("/settings/cache-size", put(cache_size_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy granting access to a single viewer origin, or to none.
pub fn cors_layer(allowed_origin: Option<HeaderValue>) -> CorsLayer {
    match allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::list([origin]))
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new(),
    }
}
