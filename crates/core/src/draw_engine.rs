//! Weighted draw over a [`DrawConfiguration`].
//!
//! Selection is cumulative: categories are walked in declaration order and
//! the first one whose running total exceeds the uniform sample `u` wins, so
//! a sample sitting exactly on a boundary belongs to the following category.
//! The random source is injected so the selection can be tested exactly.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

use crate::draw_config::{DrawConfiguration, DrawConfigurationRegistry, DrawItem};
use crate::error::CoreError;
use crate::rarity::RarityTier;

/// Result of a single draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawResult {
    pub version: String,
    pub rarity: RarityTier,
    pub item: DrawItem,
}

/// Per-category effective weights, in declaration order.
pub fn category_weights(config: &DrawConfiguration) -> Vec<f64> {
    config.categories.iter().map(|c| c.effective_weight()).collect()
}

/// Index of the category owning sample `u`, or `None` when floating-point
/// drift leaves `u` past the last running total.
pub fn select_category(weights: &[f64], u: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if u < cumulative {
            return Some(index);
        }
    }
    None
}

/// Draw one item from `config` using `rng`.
pub fn draw<R: Rng>(config: &DrawConfiguration, rng: &mut R) -> Result<DrawResult, CoreError> {
    let total = checked_total(config)?;
    let u = rng.random_range(0.0..total);
    draw_at(config, u, rng)
}

/// Draw the item owning category sample `u`; `rng` only picks the item
/// inside the category. A sample past the last running total falls back to
/// the first declared category.
pub fn draw_at<R: Rng>(
    config: &DrawConfiguration,
    u: f64,
    rng: &mut R,
) -> Result<DrawResult, CoreError> {
    let total = checked_total(config)?;
    let weights = category_weights(config);
    let index = match select_category(&weights, u) {
        Some(index) => index,
        None => {
            tracing::warn!(
                version = %config.version,
                u,
                total,
                "Draw sample fell past the last category; using first category",
            );
            0
        }
    };

    let category = &config.categories[index];
    if category.items.is_empty() {
        return Err(CoreError::EmptyConfiguration(config.version.clone()));
    }
    let item = category.items[rng.random_range(0..category.items.len())].clone();

    Ok(DrawResult {
        version: config.version.clone(),
        rarity: category.name,
        item,
    })
}

fn checked_total(config: &DrawConfiguration) -> Result<f64, CoreError> {
    let total: f64 = category_weights(config).iter().sum();
    if config.categories.is_empty() || !total.is_finite() || total <= 0.0 {
        return Err(CoreError::EmptyConfiguration(config.version.clone()));
    }
    Ok(total)
}

/// Draws against the versions held by a [`DrawConfigurationRegistry`].
#[derive(Debug, Clone)]
pub struct WeightedDrawEngine {
    registry: Arc<DrawConfigurationRegistry>,
}

impl WeightedDrawEngine {
    pub fn new(registry: Arc<DrawConfigurationRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &DrawConfigurationRegistry {
        &self.registry
    }

    /// Draw from `version`, or from the latest version when `None`.
    pub fn draw<R: Rng>(
        &self,
        version: Option<&str>,
        rng: &mut R,
    ) -> Result<DrawResult, CoreError> {
        let config = match version {
            Some(v) => self.registry.get_configuration(v)?,
            None => self.registry.latest_version(),
        };
        draw(config, rng)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
