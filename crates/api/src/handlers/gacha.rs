//! Gacha handlers: version picker, draws, and draw history.

use std::collections::{HashMap, HashSet};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubroom_core::draw_config::VersionSummary;
use clubroom_core::resource_key::{derive_resource_key, preview_cache_key};
use clubroom_core::types::DbId;
use clubroom_db::models::gacha_draw::GachaDraw;
use clubroom_gacha::{DrawOutcome, DrawRequest, FailureKind};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Default number of history rows returned.
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Upper bound on history rows per request.
pub const MAX_HISTORY_LIMIT: i64 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A version summary with its cover image URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionListing {
    #[serde(flatten)]
    pub summary: VersionSummary,
    /// `null` when the cover could not be signed.
    pub cover_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub user_id: DbId,
    pub limit: Option<i64>,
}

/// A recorded draw with the user's preview URL of its asset.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub draw: GachaDraw,
    /// `null` when the asset could not be signed.
    pub preview_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawHistory {
    pub draws: Vec<HistoryEntry>,
    /// Limited draws made since the start of the UTC day.
    pub used_today: i64,
    pub daily_limit: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/gacha/versions
///
/// Every version in declaration order. Cover URLs are resolved in one batch.
pub async fn list_versions(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let summaries = state.registry.summaries();

    let mut cover_keys: HashMap<String, String> = HashMap::new();
    for summary in &summaries {
        match derive_resource_key(&summary.cover_key) {
            Ok(key) => {
                cover_keys.insert(summary.version.clone(), key);
            }
            Err(e) => {
                tracing::warn!(version = %summary.version, error = %e, "Invalid cover key");
            }
        }
    }

    let keys: Vec<String> = cover_keys.values().cloned().collect();
    let urls = state.cache.resolve(&keys).await;

    let listings: Vec<VersionListing> = summaries
        .into_iter()
        .map(|summary| {
            let cover_url = cover_keys
                .get(&summary.version)
                .and_then(|key| urls.get(key).cloned().flatten());
            VersionListing { summary, cover_url }
        })
        .collect();

    Ok(Json(DataResponse { data: listings }))
}

/// POST /api/v1/gacha/draw
///
/// Runs one draw. The body is always the outcome; the status reflects the
/// failure kind.
pub async fn draw(
    State(state): State<AppState>,
    Json(input): Json<DrawRequest>,
) -> AppResult<impl IntoResponse> {
    if let Some(version) = &input.version {
        if version.trim().is_empty() {
            return Err(AppError::BadRequest("version must not be empty".into()));
        }
    }

    let cancel = state.shutdown.child_token();
    let outcome = state.orchestrator.draw_with_cancel(&input, &cancel).await;

    let status = match &outcome {
        DrawOutcome::Success { .. } => StatusCode::OK,
        DrawOutcome::Failure { kind, .. } => status_for_failure(*kind),
    };

    Ok((status, Json(DataResponse { data: outcome })))
}

/// GET /api/v1/gacha/draws?userId=&limit=
///
/// Each entry carries a preview URL. Previews are cached per user and asset
/// until the user draws that asset again.
pub async fn list_draws(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> AppResult<impl IntoResponse> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let draws = state.recorder.list_for_user(params.user_id, limit).await?;
    let draws = attach_previews(&state, params.user_id, draws).await;
    let used_today = state.recorder.count_today(params.user_id).await?;

    Ok(Json(DataResponse {
        data: DrawHistory {
            draws,
            used_today,
            daily_limit: state.recorder.daily_limit(),
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pair each draw with its preview URL. Cached previews are reused; the rest
/// are resolved in one batch and linked to the user's preview keys.
async fn attach_previews(
    state: &AppState,
    user_id: DbId,
    draws: Vec<GachaDraw>,
) -> Vec<HistoryEntry> {
    let mut previews: HashMap<String, Option<String>> = HashMap::new();
    let mut pending: Vec<(String, String)> = Vec::new();
    let mut seen = HashSet::new();

    for draw in &draws {
        if !seen.insert(draw.asset_path.as_str()) {
            continue;
        }
        let preview_key = preview_cache_key(user_id, &draw.asset_path);
        if let Some(url) = state.cache.get_fresh(&preview_key).await {
            previews.insert(draw.asset_path.clone(), Some(url));
            continue;
        }
        match derive_resource_key(&draw.asset_path) {
            Ok(key) => pending.push((draw.asset_path.clone(), key)),
            Err(e) => {
                tracing::warn!(
                    user_id,
                    asset_path = %draw.asset_path,
                    error = %e,
                    "Recorded draw has no resource key",
                );
                previews.insert(draw.asset_path.clone(), None);
            }
        }
    }

    if !pending.is_empty() {
        let keys: Vec<String> = pending.iter().map(|(_, key)| key.clone()).collect();
        state.cache.resolve(&keys).await;
        for (asset_path, key) in pending {
            let url = state
                .cache
                .alias(&preview_cache_key(user_id, &asset_path), &key)
                .await;
            previews.insert(asset_path, url);
        }
    }

    draws
        .into_iter()
        .map(|draw| {
            let preview_url = previews.get(&draw.asset_path).cloned().flatten();
            HistoryEntry { draw, preview_url }
        })
        .collect()
}

/// HTTP status for a failed draw.
pub fn status_for_failure(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::EngineFailure => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::PersistenceFailure => StatusCode::CONFLICT,
        FailureKind::SigningFailure => StatusCode::BAD_GATEWAY,
        FailureKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        FailureKind::MissingResourceKeyDerivation | FailureKind::Unknown => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
