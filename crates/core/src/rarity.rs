//! Reward grades attached to draw categories.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Reward grade of a draw category, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    Common,
    Rare,
    SuperRare,
    UltraRare,
    Secret,
}

impl RarityTier {
    /// Parse from the stored `rarity` column value.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "common" => Ok(Self::Common),
            "rare" => Ok(Self::Rare),
            "super_rare" => Ok(Self::SuperRare),
            "ultra_rare" => Ok(Self::UltraRare),
            "secret" => Ok(Self::Secret),
            other => Err(CoreError::Validation(format!(
                "Unknown rarity tier '{other}'"
            ))),
        }
    }

    /// Stored / wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::SuperRare => "super_rare",
            Self::UltraRare => "ultra_rare",
            Self::Secret => "secret",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Rare => "Rare",
            Self::SuperRare => "Super Rare",
            Self::UltraRare => "Ultra Rare",
            Self::Secret => "Secret",
        }
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
