//! Integration Tests for the Durable Cache
//!
//! Exercises the cache manager over the filesystem store, across reopens,
//! and preloading through the HTTP fetcher against a local server.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use pdf_cache::{
    cache::{CacheManager, PreloadOutcome, BLOB_PARTITION, META_PARTITION, STORE_VERSION},
    error::{CacheError, PreloadError},
    fetch::HttpFetcher,
    settings::FixedBudget,
    store::{FsStore, Store},
    AppState, Config,
};
use tempfile::tempdir;

// == Helper Functions ==

async fn open_store(root: &Path) -> FsStore {
    FsStore::open(
        root,
        "pdf-cache",
        &[BLOB_PARTITION, META_PARTITION],
        STORE_VERSION,
    )
    .await
    .unwrap()
}

async fn open_cache(root: &Path, budget: u64) -> CacheManager {
    let store = open_store(root).await;
    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    CacheManager::new(Arc::new(store), Arc::new(FixedBudget(budget)), Arc::new(fetcher))
}

/// Serves `/doc.pdf`, `/empty.pdf` and 404 elsewhere; counts document hits.
async fn spawn_document_server(hits: Arc<AtomicUsize>) -> SocketAddr {
    let app = Router::new()
        .route(
            "/doc.pdf",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    b"%PDF-1.7 remote document".to_vec()
                }
            }),
        )
        .route("/empty.pdf", get(|| async { Vec::<u8>::new() }))
        .route("/large.pdf", get(|| async { vec![b'x'; 4096] }))
        .fallback(|| async { StatusCode::NOT_FOUND });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// == Persistence Tests ==

#[tokio::test]
async fn test_foreign_files_do_not_block_the_cache() {
    let temp = tempdir().unwrap();
    let cache = open_cache(temp.path(), 10_000).await;
    cache.set_cache("a", vec![1; 10]).await.unwrap();

    let store_dir = temp.path().join("pdf-cache");
    let meta_dir = store_dir.join(META_PARTITION);
    std::fs::write(meta_dir.join("deadbeef"), b"").unwrap();
    std::fs::write(store_dir.join(BLOB_PARTITION).join("stray"), b"x").unwrap();

    cache.set_cache("b", vec![2; 10]).await.unwrap();
    assert_eq!(cache.prune().await.unwrap().remaining_bytes, 20);
    assert_eq!(cache.usage().await.unwrap().entries, 2);

    cache.clear().await.unwrap();
    assert_eq!(cache.get_cache("a").await.unwrap(), None);
    assert!(!meta_dir.join("deadbeef").exists());
}


#[tokio::test]
async fn test_documents_survive_reopen() {
    let temp = tempdir().unwrap();
    let key = "https://example.com/books/core.pdf";

    {
        let cache = open_cache(temp.path(), 1024).await;
        cache.set_cache(key, b"%PDF-1.7 core".to_vec()).await.unwrap();
    }

    let cache = open_cache(temp.path(), 1024).await;
    assert_eq!(
        cache.get_cache(key).await.unwrap(),
        Some(b"%PDF-1.7 core".to_vec())
    );
    assert_eq!(cache.usage().await.unwrap().total_bytes, 13);
}

#[tokio::test]
async fn test_recency_survives_reopen() {
    let temp = tempdir().unwrap();

    {
        let cache = open_cache(temp.path(), 250).await;
        cache.set_cache("a", vec![0; 100]).await.unwrap();
        cache.set_cache("b", vec![0; 100]).await.unwrap();
        cache.get_cache("a").await.unwrap();
    }

    let cache = open_cache(temp.path(), 250).await;
    cache.set_cache("c", vec![0; 100]).await.unwrap();

    assert!(cache.get_cache("a").await.unwrap().is_some());
    assert!(cache.get_cache("b").await.unwrap().is_none());
    assert!(cache.get_cache("c").await.unwrap().is_some());
}

#[tokio::test]
async fn test_lowered_budget_applies_on_next_write() {
    let temp = tempdir().unwrap();

    {
        let cache = open_cache(temp.path(), 10_000).await;
        for key in ["a", "b", "c", "d"] {
            cache.set_cache(key, vec![0; 100]).await.unwrap();
        }
    }

    let cache = open_cache(temp.path(), 250).await;
    cache.set_cache("e", vec![0; 100]).await.unwrap();

    let usage = cache.usage().await.unwrap();
    assert_eq!(usage.entries, 2);
    assert_eq!(usage.total_bytes, 200);
    assert!(cache.get_cache("d").await.unwrap().is_some());
    assert!(cache.get_cache("e").await.unwrap().is_some());
}

#[tokio::test]
async fn test_clear_empties_disk_partitions() {
    let temp = tempdir().unwrap();
    let cache = open_cache(temp.path(), 10_000).await;
    cache.set_cache("a", vec![1; 10]).await.unwrap();
    cache.set_cache("b", vec![2; 10]).await.unwrap();

    cache.clear().await.unwrap();

    let store = open_store(temp.path()).await;
    assert_eq!(store.keys(BLOB_PARTITION).await.unwrap().len(), 0);
    assert_eq!(store.keys(META_PARTITION).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_app_state_from_config() {
    let temp = tempdir().unwrap();
    let config = Config {
        cache_dir: temp.path().to_path_buf(),
        ..Config::default()
    };

    let state = AppState::from_config(&config).await.unwrap();
    state.cache.set_cache("k", vec![1, 2, 3]).await.unwrap();

    assert!(temp.path().join("pdf-cache").join(BLOB_PARTITION).is_dir());
    assert_eq!(state.cache.usage().await.unwrap().budget_bytes, 256 * 1024 * 1024);
}

// == Preload Over HTTP Tests ==

#[tokio::test]
async fn test_preload_over_http_fetches_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_document_server(hits.clone()).await;
    let temp = tempdir().unwrap();
    let cache = open_cache(temp.path(), 10_000).await;
    let url = format!("http://{addr}/doc.pdf");

    let first = cache.preload(&url).await.unwrap();
    let second = cache.preload(&url).await.unwrap();

    assert_eq!(first, PreloadOutcome::Fetched { bytes: 24 });
    assert_eq!(second, PreloadOutcome::AlreadyCached);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        cache.get_cache(&url).await.unwrap(),
        Some(b"%PDF-1.7 remote document".to_vec())
    );
}

#[tokio::test]
async fn test_preload_over_http_not_found() {
    let addr = spawn_document_server(Arc::new(AtomicUsize::new(0))).await;
    let temp = tempdir().unwrap();
    let cache = open_cache(temp.path(), 10_000).await;
    let url = format!("http://{addr}/missing.pdf");

    let result = cache.preload(&url).await;

    assert!(matches!(
        result,
        Err(CacheError::Preload(PreloadError::Status { status: 404, .. }))
    ));
    assert_eq!(cache.get_cache(&url).await.unwrap(), None);
}

#[tokio::test]
async fn test_preload_over_http_empty_body() {
    let addr = spawn_document_server(Arc::new(AtomicUsize::new(0))).await;
    let temp = tempdir().unwrap();
    let cache = open_cache(temp.path(), 10_000).await;

    let result = cache.preload(&format!("http://{addr}/empty.pdf")).await;

    assert!(matches!(
        result,
        Err(CacheError::Preload(PreloadError::EmptyBody(_)))
    ));
}

#[tokio::test]
async fn test_preload_over_http_rejects_oversized_document() {
    let addr = spawn_document_server(Arc::new(AtomicUsize::new(0))).await;
    let temp = tempdir().unwrap();
    let store = open_store(temp.path()).await;
    let fetcher = HttpFetcher::new(Duration::from_secs(5))
        .unwrap()
        .with_max_bytes(1024);
    let cache = CacheManager::new(
        Arc::new(store),
        Arc::new(FixedBudget(10_000)),
        Arc::new(fetcher),
    );
    let url = format!("http://{addr}/large.pdf");

    let result = cache.preload(&url).await;

    assert!(matches!(
        result,
        Err(CacheError::Preload(PreloadError::TooLarge { limit: 1024, .. }))
    ));
    assert_eq!(cache.get_cache(&url).await.unwrap(), None);
}
