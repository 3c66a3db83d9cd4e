#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use clubroom_api::config::ServerConfig;
use clubroom_api::router::build_app_router;
use clubroom_api::state::AppState;
use clubroom_core::draw_config::{CategorySpec, DrawConfigurationRegistry, VersionSpec};
use clubroom_core::draw_engine::WeightedDrawEngine;
use clubroom_core::rarity::RarityTier;
use clubroom_gacha::{DrawOrchestrator, DrawRecord, DrawRecorder, PersistError, PgDrawRecorder};
use clubroom_storage::{CacheConfig, ResourceSigner, SignedResourceCache, SignedUrls, SigningError};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 1,
    }
}

/// Pool that never connects; for tests whose routes do not touch the database.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://clubroom@localhost/unused")
        .unwrap()
}

/// Single-item table: every draw yields [`SINGLE_ASSET`].
pub const SINGLE_ITEM: &[VersionSpec] = &[VersionSpec {
    key: "version1",
    title: "Single",
    cover_key: "gacha/version1/cover.webp",
    categories: &[CategorySpec {
        rarity: RarityTier::Rare,
        prefix: "rare",
        probability: 1.0,
        count: 1,
    }],
}];

pub const SINGLE_ASSET: &str = "/gacha/version1/rare/rare_1.webp";
pub const SINGLE_KEY: &str = "gacha/version1/rare/rare_1.webp";

/// Signs every key as `https://signed/<key>` except those in `omit`. Fails
/// whole batches while `fail` is set.
#[derive(Default)]
pub struct FakeSigner {
    pub calls: AtomicUsize,
    pub omit: Vec<String>,
    pub fail: AtomicBool,
}

impl FakeSigner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceSigner for FakeSigner {
    async fn sign_resource_keys(&self, keys: &[String]) -> Result<SignedUrls, SigningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SigningError::Unavailable("backend down".into()));
        }
        Ok(keys
            .iter()
            .filter(|k| !self.omit.contains(k))
            .map(|k| (k.clone(), format!("https://signed/{k}")))
            .collect())
    }
}

/// Accepts every draw and remembers it.
#[derive(Default)]
pub struct MemoryRecorder {
    pub records: Mutex<Vec<DrawRecord>>,
}

#[async_trait]
impl DrawRecorder for MemoryRecorder {
    async fn persist_draw(&self, record: &DrawRecord) -> Result<(), PersistError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub signer: Arc<FakeSigner>,
    pub cache: SignedResourceCache,
    pub shutdown: CancellationToken,
}

/// App whose orchestrator persists through `recorder`; history routes use
/// a Postgres recorder over `pool`.
pub fn build_test_app_with(
    pool: PgPool,
    recorder: Arc<dyn DrawRecorder>,
    signer: Arc<FakeSigner>,
) -> TestApp {
    let registry = DrawConfigurationRegistry::builtin().unwrap();
    build_app(pool, recorder, signer, registry)
}

fn build_app(
    pool: PgPool,
    recorder: Arc<dyn DrawRecorder>,
    signer: Arc<FakeSigner>,
    registry: DrawConfigurationRegistry,
) -> TestApp {
    let config = test_config();
    let registry = Arc::new(registry);
    let cache = SignedResourceCache::new(signer.clone(), CacheConfig::default());
    let orchestrator = Arc::new(DrawOrchestrator::new(
        WeightedDrawEngine::new(registry.clone()),
        recorder,
        cache.clone(),
    ));
    let shutdown = CancellationToken::new();

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        registry,
        cache: cache.clone(),
        recorder: Arc::new(PgDrawRecorder::new(pool, 3)),
        orchestrator,
        shutdown: shutdown.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        signer,
        cache,
        shutdown,
    }
}

/// Postgres-backed app over [`SINGLE_ITEM`] with a daily limit of 3.
pub fn build_single_item_app(pool: PgPool) -> TestApp {
    let recorder = Arc::new(PgDrawRecorder::new(pool.clone(), 3));
    let registry = DrawConfigurationRegistry::from_specs(SINGLE_ITEM).unwrap();
    build_app(pool, recorder, Arc::new(FakeSigner::default()), registry)
}

/// App backed entirely by Postgres with a daily limit of 3.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let recorder = Arc::new(PgDrawRecorder::new(pool.clone(), 3));
    build_test_app_with(pool, recorder, Arc::new(FakeSigner::default()))
}

/// App with an in-memory recorder and no database.
pub fn build_memory_app() -> (TestApp, Arc<MemoryRecorder>) {
    let recorder = Arc::new(MemoryRecorder::default());
    let app = build_test_app_with(lazy_pool(), recorder.clone(), Arc::new(FakeSigner::default()));
    (app, recorder)
}

/// Send a request and return status plus parsed JSON body.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
