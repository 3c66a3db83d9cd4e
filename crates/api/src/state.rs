use std::sync::Arc;

use clubroom_core::draw_config::DrawConfigurationRegistry;
use clubroom_gacha::{DrawOrchestrator, PgDrawRecorder};
use clubroom_storage::SignedResourceCache;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is itself a handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: clubroom_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub registry: Arc<DrawConfigurationRegistry>,
    /// Signed URL cache shared with the orchestrator.
    pub cache: SignedResourceCache,
    pub recorder: Arc<PgDrawRecorder>,
    pub orchestrator: Arc<DrawOrchestrator>,
    /// Cancelled when the server begins shutting down; in-flight draws settle
    /// as cancelled.
    pub shutdown: CancellationToken,
}
