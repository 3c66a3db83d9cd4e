//! Repository for the `gacha_draws` table.

use clubroom_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::gacha_draw::{CreateGachaDraw, GachaDraw};

const COLUMNS: &str = "id, user_id, version, rarity, asset_path, ignored_limit, created_at";

/// Provides insert and lookup operations for the draw log.
pub struct GachaDrawRepo;

impl GachaDrawRepo {
    /// Record a draw. Returns the stored row.
    pub async fn create(pool: &PgPool, input: &CreateGachaDraw) -> Result<GachaDraw, sqlx::Error> {
        let query = format!(
            "INSERT INTO gacha_draws (user_id, version, rarity, asset_path, ignored_limit) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GachaDraw>(&query)
            .bind(input.user_id)
            .bind(&input.version)
            .bind(&input.rarity)
            .bind(&input.asset_path)
            .bind(input.ignored_limit)
            .fetch_one(pool)
            .await
    }

    /// Count the user's draws created at or after `since`. Draws recorded
    /// with `ignored_limit` do not count.
    pub async fn count_since(
        pool: &PgPool,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM gacha_draws \
             WHERE user_id = $1 AND created_at >= $2 AND NOT ignored_limit",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Most recent draws of a user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<GachaDraw>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM gacha_draws \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, GachaDraw>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
