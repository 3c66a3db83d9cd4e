//! Persisting draws: the recorder contract and its Postgres implementation.

use async_trait::async_trait;
use chrono::NaiveTime;
use clubroom_core::rarity::RarityTier;
use clubroom_core::types::{DbId, Timestamp};
use clubroom_db::models::gacha_draw::{CreateGachaDraw, GachaDraw};
use clubroom_db::repositories::GachaDrawRepo;
use clubroom_db::DbPool;
use serde::Serialize;

/// What gets persisted for one draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRecord {
    pub version: String,
    pub user_id: DbId,
    pub rarity: RarityTier,
    pub asset_path: String,
    /// Skip the daily draw limit (admin and event draws).
    pub ignore_limit: bool,
}

/// Why a draw could not be persisted. Displays the recorder's own message.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Daily draw limit of {limit} reached")]
    DailyLimitReached { limit: i64 },

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Database(#[from] sqlx::Error),
}

/// Persists draw results.
#[async_trait]
pub trait DrawRecorder: Send + Sync {
    async fn persist_draw(&self, record: &DrawRecord) -> Result<(), PersistError>;
}

/// Start of the UTC day containing `now`.
pub fn start_of_utc_day(now: Timestamp) -> Timestamp {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Records draws in `gacha_draws`, enforcing a per-user daily limit.
///
/// The count-then-insert is not serialized per user, so two simultaneous
/// draws at the limit may both pass.
#[derive(Debug, Clone)]
pub struct PgDrawRecorder {
    pool: DbPool,
    daily_limit: i64,
}

impl PgDrawRecorder {
    pub fn new(pool: DbPool, daily_limit: i64) -> Self {
        Self { pool, daily_limit }
    }

    /// Limited draws the user has made today.
    pub async fn count_today(&self, user_id: DbId) -> Result<i64, sqlx::Error> {
        let since = start_of_utc_day(chrono::Utc::now());
        GachaDrawRepo::count_since(&self.pool, user_id, since).await
    }

    /// The user's most recent draws, newest first.
    pub async fn list_for_user(
        &self,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<GachaDraw>, sqlx::Error> {
        GachaDrawRepo::list_for_user(&self.pool, user_id, limit).await
    }

    pub fn daily_limit(&self) -> i64 {
        self.daily_limit
    }
}

#[async_trait]
impl DrawRecorder for PgDrawRecorder {
    async fn persist_draw(&self, record: &DrawRecord) -> Result<(), PersistError> {
        if !record.ignore_limit {
            let used = self.count_today(record.user_id).await?;
            if used >= self.daily_limit {
                tracing::info!(
                    user_id = record.user_id,
                    used,
                    limit = self.daily_limit,
                    "Daily draw limit reached",
                );
                return Err(PersistError::DailyLimitReached {
                    limit: self.daily_limit,
                });
            }
        }

        let row = GachaDrawRepo::create(
            &self.pool,
            &CreateGachaDraw {
                user_id: record.user_id,
                version: record.version.clone(),
                rarity: record.rarity.name().to_string(),
                asset_path: record.asset_path.clone(),
                ignored_limit: record.ignore_limit,
            },
        )
        .await?;

        tracing::debug!(draw_id = row.id, user_id = row.user_id, "Draw recorded");
        Ok(())
    }
}
