//! Versioned reward tables for the gacha draw.
//!
//! Each version is declared once in [`BUILTIN_VERSIONS`] as a list of
//! [`CategorySpec`]s and expanded at start-up into a [`DrawConfiguration`]
//! whose items are generated deterministically (`prefix_1 .. prefix_count`).
//! Category order is significant: it is the tie-break order of the draw
//! engine and must never be re-sorted.

use serde::Serialize;

use crate::error::CoreError;
use crate::rarity::RarityTier;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Version keys follow `version<N>`; `N` orders versions for [`latest`](DrawConfigurationRegistry::latest_version).
pub const VERSION_KEY_PREFIX: &str = "version";

/// Root directory of all gacha assets in the bucket.
pub const ASSET_ROOT: &str = "gacha";

/// File extension of generated item assets.
pub const ASSET_EXTENSION: &str = "webp";

// ---------------------------------------------------------------------------
// Static table declarations
// ---------------------------------------------------------------------------

/// Declaration of one rarity category inside a version table.
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub rarity: RarityTier,
    /// Item id / file name prefix, e.g. `"rare"` produces `rare_1 .. rare_N`.
    pub prefix: &'static str,
    /// Per-item draw weight. The category's effective weight is
    /// `probability * count`.
    pub probability: f64,
    pub count: u32,
}

/// Declaration of one version table.
#[derive(Debug, Clone, Copy)]
pub struct VersionSpec {
    pub key: &'static str,
    pub title: &'static str,
    /// Resource key of the cover image shown on the version picker.
    pub cover_key: &'static str,
    pub categories: &'static [CategorySpec],
}

/// Reward tables shipped with the site, in declaration order.
pub const BUILTIN_VERSIONS: &[VersionSpec] = &[
    VersionSpec {
        key: "version1",
        title: "Clubroom Collection Vol.1",
        cover_key: "gacha/version1/cover.webp",
        categories: &[
            CategorySpec { rarity: RarityTier::Common, prefix: "common", probability: 400.0, count: 10 },
            CategorySpec { rarity: RarityTier::Rare, prefix: "rare", probability: 300.0, count: 8 },
            CategorySpec { rarity: RarityTier::SuperRare, prefix: "super_rare", probability: 150.0, count: 4 },
            CategorySpec { rarity: RarityTier::Secret, prefix: "secret", probability: 50.0, count: 2 },
        ],
    },
    VersionSpec {
        key: "version2",
        title: "Clubroom Collection Vol.2",
        cover_key: "gacha/version2/cover.webp",
        categories: &[
            CategorySpec { rarity: RarityTier::Common, prefix: "common", probability: 350.0, count: 12 },
            CategorySpec { rarity: RarityTier::Rare, prefix: "rare", probability: 250.0, count: 8 },
            CategorySpec { rarity: RarityTier::SuperRare, prefix: "super_rare", probability: 120.0, count: 5 },
            CategorySpec { rarity: RarityTier::UltraRare, prefix: "ultra_rare", probability: 60.0, count: 3 },
            CategorySpec { rarity: RarityTier::Secret, prefix: "secret", probability: 20.0, count: 1 },
        ],
    },
];

// ---------------------------------------------------------------------------
// Built configuration
// ---------------------------------------------------------------------------

/// A single drawable reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawItem {
    pub id: u32,
    pub asset_path: String,
}

/// One rarity tier of a version with its items.
#[derive(Debug, Clone, Serialize)]
pub struct DrawCategory {
    pub name: RarityTier,
    /// Per-item weight as declared.
    pub weight: f64,
    pub items: Vec<DrawItem>,
}

impl DrawCategory {
    /// Weight of the whole category: per-item weight times item count.
    pub fn effective_weight(&self) -> f64 {
        self.weight * self.items.len() as f64
    }
}

/// The full reward table of one version.
#[derive(Debug, Clone, Serialize)]
pub struct DrawConfiguration {
    pub version: String,
    pub title: String,
    pub cover_key: String,
    /// Declaration order; see module docs.
    pub categories: Vec<DrawCategory>,
}

impl DrawConfiguration {
    /// Expand a static declaration into items.
    pub fn from_spec(spec: &VersionSpec) -> Result<Self, CoreError> {
        let mut categories = Vec::with_capacity(spec.categories.len());
        for category in spec.categories {
            if category.count == 0 {
                return Err(CoreError::Validation(format!(
                    "Category '{}' of '{}' must contain at least one item",
                    category.prefix, spec.key
                )));
            }
            if !category.probability.is_finite() || category.probability < 0.0 {
                return Err(CoreError::Validation(format!(
                    "Category '{}' of '{}' has invalid probability {}",
                    category.prefix, spec.key, category.probability
                )));
            }
            categories.push(DrawCategory {
                name: category.rarity,
                weight: category.probability,
                items: generate_items(spec.key, category.prefix, category.count),
            });
        }

        Ok(Self {
            version: spec.key.to_string(),
            title: spec.title.to_string(),
            cover_key: spec.cover_key.to_string(),
            categories,
        })
    }

    /// Sum of effective weights across all categories.
    pub fn total_weight(&self) -> f64 {
        self.categories.iter().map(DrawCategory::effective_weight).sum()
    }

    /// Share of draws landing in each category, in declaration order.
    /// All zeros when the table has no weight.
    pub fn category_probabilities(&self) -> Vec<f64> {
        let total = self.total_weight();
        self.categories
            .iter()
            .map(|c| {
                if total > 0.0 {
                    c.effective_weight() / total
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Display summary of this version.
    pub fn summary(&self, latest: bool) -> VersionSummary {
        let categories = self
            .categories
            .iter()
            .zip(self.category_probabilities())
            .map(|(category, probability)| CategorySummary {
                rarity: category.name,
                label: category.name.label(),
                item_count: category.items.len(),
                weight: category.effective_weight(),
                probability,
            })
            .collect();

        VersionSummary {
            version: self.version.clone(),
            title: self.title.clone(),
            cover_key: self.cover_key.clone(),
            latest,
            categories,
        }
    }
}

/// Per-category line of a [`VersionSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub rarity: RarityTier,
    pub label: &'static str,
    pub item_count: usize,
    /// Effective weight of the category.
    pub weight: f64,
    /// `weight / total_weight`.
    pub probability: f64,
}

/// What the version picker shows for one version.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub version: String,
    pub title: String,
    pub cover_key: String,
    pub latest: bool,
    pub categories: Vec<CategorySummary>,
}

/// Build the asset path of item `index` in a category.
///
/// `/gacha/version1/rare/rare_3.webp`
pub fn item_asset_path(version: &str, prefix: &str, index: u32) -> String {
    format!("/{ASSET_ROOT}/{version}/{prefix}/{prefix}_{index}.{ASSET_EXTENSION}")
}

fn generate_items(version: &str, prefix: &str, count: u32) -> Vec<DrawItem> {
    (1..=count)
        .map(|id| DrawItem {
            id,
            asset_path: item_asset_path(version, prefix, id),
        })
        .collect()
}

/// Numeric suffix of a `version<N>` key.
pub fn parse_version_number(key: &str) -> Option<u64> {
    key.strip_prefix(VERSION_KEY_PREFIX)?.parse().ok()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Read-only lookup over all reward tables.
#[derive(Debug, Clone)]
pub struct DrawConfigurationRegistry {
    configurations: Vec<DrawConfiguration>,
}

impl DrawConfigurationRegistry {
    /// Build a registry from declarations. Rejects an empty list and
    /// duplicate version keys.
    pub fn from_specs(specs: &[VersionSpec]) -> Result<Self, CoreError> {
        if specs.is_empty() {
            return Err(CoreError::Validation(
                "At least one draw version must be declared".to_string(),
            ));
        }

        let mut configurations: Vec<DrawConfiguration> = Vec::with_capacity(specs.len());
        for spec in specs {
            if configurations.iter().any(|c| c.version == spec.key) {
                return Err(CoreError::Validation(format!(
                    "Duplicate draw version '{}'",
                    spec.key
                )));
            }
            configurations.push(DrawConfiguration::from_spec(spec)?);
        }

        Ok(Self { configurations })
    }

    /// Registry over [`BUILTIN_VERSIONS`].
    pub fn builtin() -> Result<Self, CoreError> {
        Self::from_specs(BUILTIN_VERSIONS)
    }

    /// Look up a version by key.
    pub fn get_configuration(&self, version: &str) -> Result<&DrawConfiguration, CoreError> {
        self.configurations
            .iter()
            .find(|c| c.version == version)
            .ok_or_else(|| CoreError::ConfigNotFound(version.to_string()))
    }

    /// The version with the highest `version<N>` suffix.
    ///
    /// Falls back to the first declared version when no key carries a
    /// numeric suffix. Ties keep the earliest declaration.
    pub fn latest_version(&self) -> &DrawConfiguration {
        let mut latest: Option<(u64, &DrawConfiguration)> = None;
        for config in &self.configurations {
            if let Some(n) = parse_version_number(&config.version) {
                if latest.map_or(true, |(best, _)| n > best) {
                    latest = Some((n, config));
                }
            }
        }
        match latest {
            Some((_, config)) => config,
            None => &self.configurations[0],
        }
    }

    /// All version keys in declaration order.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.configurations.iter().map(|c| c.version.as_str())
    }

    /// All configurations in declaration order.
    pub fn configurations(&self) -> &[DrawConfiguration] {
        &self.configurations
    }

    /// Summaries of every version in declaration order, with the latest one
    /// flagged.
    pub fn summaries(&self) -> Vec<VersionSummary> {
        let latest = &self.latest_version().version;
        self.configurations
            .iter()
            .map(|c| c.summary(&c.version == latest))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const NO_SUFFIX: &[VersionSpec] = &[
        VersionSpec {
            key: "spring",
            title: "Spring",
            cover_key: "gacha/spring/cover.webp",
            categories: &[CategorySpec { rarity: RarityTier::Common, prefix: "c", probability: 1.0, count: 1 }],
        },
        VersionSpec {
            key: "summer",
            title: "Summer",
            cover_key: "gacha/summer/cover.webp",
            categories: &[CategorySpec { rarity: RarityTier::Common, prefix: "c", probability: 1.0, count: 1 }],
        },
    ];

    const OUT_OF_ORDER: &[VersionSpec] = &[
        VersionSpec {
            key: "version2",
            title: "Two",
            cover_key: "gacha/version2/cover.webp",
            categories: &[CategorySpec { rarity: RarityTier::Common, prefix: "c", probability: 1.0, count: 1 }],
        },
        VersionSpec {
            key: "version10",
            title: "Ten",
            cover_key: "gacha/version10/cover.webp",
            categories: &[CategorySpec { rarity: RarityTier::Common, prefix: "c", probability: 1.0, count: 1 }],
        },
        VersionSpec {
            key: "legacy",
            title: "Legacy",
            cover_key: "gacha/legacy/cover.webp",
            categories: &[CategorySpec { rarity: RarityTier::Common, prefix: "c", probability: 1.0, count: 1 }],
        },
    ];

    #[test]
    fn builtin_registry_builds() {
        let registry = DrawConfigurationRegistry::builtin().unwrap();
        let versions: Vec<&str> = registry.versions().collect();
        assert_eq!(versions, vec!["version1", "version2"]);
    }

    #[test]
    fn every_builtin_version_has_positive_weight() {
        let registry = DrawConfigurationRegistry::builtin().unwrap();
        for config in registry.configurations() {
            assert!(config.total_weight() > 0.0, "{} has no weight", config.version);
            assert!(config.categories.iter().all(|c| !c.items.is_empty()));
        }
    }

    #[test]
    fn items_are_generated_deterministically() {
        let registry = DrawConfigurationRegistry::builtin().unwrap();
        let config = registry.get_configuration("version1").unwrap();
        let rare = &config.categories[1];
        assert_eq!(rare.name, RarityTier::Rare);
        assert_eq!(rare.items.len(), 8);
        assert_eq!(rare.items[0].id, 1);
        assert_eq!(rare.items[0].asset_path, "/gacha/version1/rare/rare_1.webp");
        assert_eq!(rare.items[7].asset_path, "/gacha/version1/rare/rare_8.webp");
    }

    #[test]
    fn effective_weight_is_per_item_weight_times_count() {
        let registry = DrawConfigurationRegistry::builtin().unwrap();
        let config = registry.get_configuration("version1").unwrap();
        assert_eq!(config.categories[0].effective_weight(), 4000.0);
        assert_eq!(config.categories[1].effective_weight(), 2400.0);
        assert_eq!(config.total_weight(), 4000.0 + 2400.0 + 600.0 + 100.0);
    }

    #[test]
    fn unknown_version_is_config_not_found() {
        let registry = DrawConfigurationRegistry::builtin().unwrap();
        assert_matches!(
            registry.get_configuration("version99"),
            Err(CoreError::ConfigNotFound(v)) if v == "version99"
        );
    }

    #[test]
    fn latest_version_uses_numeric_suffix() {
        let registry = DrawConfigurationRegistry::from_specs(OUT_OF_ORDER).unwrap();
        assert_eq!(registry.latest_version().version, "version10");
    }

    #[test]
    fn latest_version_falls_back_to_first_declared() {
        let registry = DrawConfigurationRegistry::from_specs(NO_SUFFIX).unwrap();
        assert_eq!(registry.latest_version().version, "spring");
    }

    #[test]
    fn builtin_latest_is_version2() {
        let registry = DrawConfigurationRegistry::builtin().unwrap();
        assert_eq!(registry.latest_version().version, "version2");
    }

    #[test]
    fn empty_spec_list_rejected() {
        assert_matches!(
            DrawConfigurationRegistry::from_specs(&[]),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn zero_count_category_rejected() {
        let spec = VersionSpec {
            key: "version1",
            title: "Bad",
            cover_key: "gacha/version1/cover.webp",
            categories: &[CategorySpec { rarity: RarityTier::Rare, prefix: "rare", probability: 1.0, count: 0 }],
        };
        assert_matches!(DrawConfiguration::from_spec(&spec), Err(CoreError::Validation(_)));
    }

    #[test]
    fn duplicate_version_rejected() {
        let spec = BUILTIN_VERSIONS[0];
        assert_matches!(
            DrawConfigurationRegistry::from_specs(&[spec, spec]),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn category_probabilities_sum_to_one() {
        let registry = DrawConfigurationRegistry::builtin().unwrap();
        for config in registry.configurations() {
            let sum: f64 = config.category_probabilities().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "{} sums to {sum}", config.version);
        }
    }

    #[test]
    fn summaries_flag_latest_and_keep_order() {
        let registry = DrawConfigurationRegistry::builtin().unwrap();
        let summaries = registry.summaries();
        assert_eq!(summaries.len(), 2);
        assert!(!summaries[0].latest);
        assert!(summaries[1].latest);

        let common = &summaries[0].categories[0];
        assert_eq!(common.rarity, RarityTier::Common);
        assert_eq!(common.item_count, 10);
        assert_eq!(common.weight, 4000.0);
        assert!((common.probability - 4000.0 / 7100.0).abs() < 1e-12);
        assert_eq!(summaries[0].cover_key, "gacha/version1/cover.webp");
    }

    #[test]
    fn parse_version_number_cases() {
        assert_eq!(parse_version_number("version3"), Some(3));
        assert_eq!(parse_version_number("version"), None);
        assert_eq!(parse_version_number("v3"), None);
        assert_eq!(parse_version_number("versionX"), None);
    }
}
