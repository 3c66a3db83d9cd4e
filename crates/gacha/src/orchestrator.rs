//! End-to-end draw: select, then persist and sign concurrently.
//!
//! The engine runs synchronously. Its result is persisted and its asset's
//! resource key is resolved through the [`SignedResourceCache`] at the same
//! time; both effects are awaited before an outcome is produced. A
//! persistence failure takes precedence over a missing URL.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use clubroom_core::draw_engine::{DrawResult, WeightedDrawEngine};
use clubroom_core::resource_key::{derive_resource_key, preview_cache_key};
use clubroom_core::types::DbId;
use clubroom_storage::SignedResourceCache;
use futures::FutureExt;
use rand::Rng;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::outcome::{DrawOutcome, FailureKind};
use crate::persistence::{DrawRecord, DrawRecorder, PersistError};

/// Parameters of one draw.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    pub user_id: DbId,
    /// Version key; the latest version when absent.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub ignore_limit: bool,
}

/// Runs draws against the engine, a recorder, and the signed URL cache.
#[derive(Clone)]
pub struct DrawOrchestrator {
    engine: WeightedDrawEngine,
    recorder: Arc<dyn DrawRecorder>,
    cache: SignedResourceCache,
}

impl DrawOrchestrator {
    pub fn new(
        engine: WeightedDrawEngine,
        recorder: Arc<dyn DrawRecorder>,
        cache: SignedResourceCache,
    ) -> Self {
        Self {
            engine,
            recorder,
            cache,
        }
    }

    pub fn engine(&self) -> &WeightedDrawEngine {
        &self.engine
    }

    pub fn cache(&self) -> &SignedResourceCache {
        &self.cache
    }

    /// Draw with the thread-local RNG and no cancellation.
    pub async fn draw(&self, request: &DrawRequest) -> DrawOutcome {
        self.draw_with_cancel(request, &CancellationToken::new()).await
    }

    /// Draw with the thread-local RNG. Returns [`FailureKind::Cancelled`] if
    /// `cancel` fires before persistence and signing have both settled.
    pub async fn draw_with_cancel(
        &self,
        request: &DrawRequest,
        cancel: &CancellationToken,
    ) -> DrawOutcome {
        let selected = {
            let mut rng = rand::rng();
            self.select(request, &mut rng)
        };
        match selected {
            Ok((result, resource_key)) => self.settle(request, result, resource_key, cancel).await,
            Err(outcome) => outcome,
        }
    }

    /// Draw with a caller-supplied RNG.
    pub async fn draw_with_rng<R: Rng>(
        &self,
        request: &DrawRequest,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> DrawOutcome {
        match self.select(request, rng) {
            Ok((result, resource_key)) => self.settle(request, result, resource_key, cancel).await,
            Err(outcome) => outcome,
        }
    }

    fn select<R: Rng>(
        &self,
        request: &DrawRequest,
        rng: &mut R,
    ) -> Result<(DrawResult, String), DrawOutcome> {
        let result = self
            .engine
            .draw(request.version.as_deref(), rng)
            .map_err(|e| {
                tracing::warn!(
                    user_id = request.user_id,
                    version = ?request.version,
                    error = %e,
                    "Draw failed",
                );
                DrawOutcome::failure(FailureKind::EngineFailure, e.to_string())
            })?;

        let resource_key = derive_resource_key(&result.item.asset_path).map_err(|e| {
            tracing::error!(
                user_id = request.user_id,
                asset_path = %result.item.asset_path,
                error = %e,
                "Drawn item has no resource key",
            );
            DrawOutcome::failure(FailureKind::MissingResourceKeyDerivation, e.to_string())
        })?;

        Ok((result, resource_key))
    }

    async fn settle(
        &self,
        request: &DrawRequest,
        result: DrawResult,
        resource_key: String,
        cancel: &CancellationToken,
    ) -> DrawOutcome {
        let record = DrawRecord {
            version: result.version.clone(),
            user_id: request.user_id,
            rarity: result.rarity,
            asset_path: result.item.asset_path.clone(),
            ignore_limit: request.ignore_limit,
        };

        let effects = async {
            tokio::join!(
                self.recorder.persist_draw(&record),
                self.cache.resolve_one(&resource_key),
            )
        };

        let (persisted, signed_url) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(user_id = request.user_id, "Draw cancelled");
                return DrawOutcome::failure(FailureKind::Cancelled, "Draw was cancelled");
            }
            settled = AssertUnwindSafe(effects).catch_unwind() => match settled {
                Ok(pair) => pair,
                Err(_) => {
                    tracing::error!(user_id = request.user_id, "Draw effects panicked");
                    return DrawOutcome::failure(FailureKind::Unknown, "Unexpected draw failure");
                }
            },
        };

        if let Err(e) = persisted {
            match &e {
                PersistError::DailyLimitReached { .. } | PersistError::Rejected(_) => {
                    tracing::info!(user_id = request.user_id, error = %e, "Draw not recorded");
                }
                PersistError::Database(_) => {
                    tracing::error!(user_id = request.user_id, error = %e, "Failed to record draw");
                }
            }
            return DrawOutcome::failure(FailureKind::PersistenceFailure, e.to_string());
        }

        let Some(signed_url) = signed_url else {
            tracing::warn!(
                user_id = request.user_id,
                resource_key = %resource_key,
                "Draw recorded but no signed URL available",
            );
            return DrawOutcome::failure(
                FailureKind::SigningFailure,
                format!("No signed URL for '{resource_key}'"),
            );
        };

        self.cache
            .clear(&preview_cache_key(request.user_id, &result.item.asset_path))
            .await;

        tracing::info!(
            user_id = request.user_id,
            version = %result.version,
            rarity = %result.rarity,
            item_id = result.item.id,
            "Draw completed",
        );

        DrawOutcome::Success {
            rarity: result.rarity,
            item: result.item,
            resource_key,
            signed_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
