use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clubroom_api::config::ServerConfig;
use clubroom_api::router::build_app_router;
use clubroom_api::state::AppState;
use clubroom_core::draw_config::DrawConfigurationRegistry;
use clubroom_core::draw_engine::WeightedDrawEngine;
use clubroom_gacha::{DrawOrchestrator, GachaConfig, PgDrawRecorder};
use clubroom_storage::s3::S3Signer;
use clubroom_storage::{CacheConfig, S3SignerConfig, SignedResourceCache};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "clubroom_api=debug,clubroom_gacha=debug,clubroom_storage=debug,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let cache_config = CacheConfig::from_env();
    let signer_config = S3SignerConfig::from_env();
    let gacha_config = GachaConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        bucket = %signer_config.bucket,
        daily_limit = gacha_config.daily_limit,
        "Loaded configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = clubroom_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    clubroom_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    clubroom_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Draw tables ---
    let registry =
        Arc::new(DrawConfigurationRegistry::builtin().expect("Built-in draw tables are invalid"));
    tracing::info!(
        versions = registry.configurations().len(),
        latest = %registry.latest_version().version,
        "Draw tables loaded",
    );

    // --- Signing + cache ---
    let signer = Arc::new(S3Signer::from_config(&signer_config).await);
    let cache = SignedResourceCache::new(signer, cache_config);

    // --- Orchestrator ---
    let recorder = Arc::new(PgDrawRecorder::new(pool.clone(), gacha_config.daily_limit));
    let orchestrator = Arc::new(DrawOrchestrator::new(
        WeightedDrawEngine::new(Arc::clone(&registry)),
        recorder.clone(),
        cache.clone(),
    ));

    let shutdown = CancellationToken::new();

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        registry,
        cache: cache.clone(),
        recorder,
        orchestrator,
        shutdown: shutdown.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let shutdown_trigger = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_trigger.cancel();
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining signing requests");

    let drain = async {
        while cache.pending_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(config.shutdown_timeout_secs), drain)
        .await
        .is_err()
    {
        tracing::warn!(
            pending = cache.pending_count().await,
            "Signing requests still pending at shutdown",
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
