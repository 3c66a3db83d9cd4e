//! Gacha draw log model and DTOs.

use clubroom_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `gacha_draws` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GachaDraw {
    pub id: DbId,
    pub user_id: DbId,
    pub version: String,
    pub rarity: String,
    pub asset_path: String,
    pub ignored_limit: bool,
    pub created_at: Timestamp,
}

/// DTO for recording a draw.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGachaDraw {
    pub user_id: DbId,
    pub version: String,
    pub rarity: String,
    pub asset_path: String,
    pub ignored_limit: bool,
}
