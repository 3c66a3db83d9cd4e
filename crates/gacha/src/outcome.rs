use clubroom_core::draw_config::DrawItem;
use clubroom_core::rarity::RarityTier;
use serde::Serialize;

/// Classification of a failed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// The engine could not draw (unknown version, empty table).
    EngineFailure,
    /// The drawn asset path does not map to a resource key.
    MissingResourceKeyDerivation,
    /// The draw was not persisted.
    PersistenceFailure,
    /// The draw was persisted but no signed URL could be obtained.
    SigningFailure,
    /// The caller abandoned the draw before it settled.
    Cancelled,
    Unknown,
}

/// Result of one orchestrated draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DrawOutcome {
    Success {
        rarity: RarityTier,
        item: DrawItem,
        resource_key: String,
        signed_url: String,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl DrawOutcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure kind, if this is a failure.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_with_status_tag() {
        let outcome = DrawOutcome::Success {
            rarity: RarityTier::Rare,
            item: DrawItem {
                id: 2,
                asset_path: "/gacha/version1/rare/rare_2.webp".into(),
            },
            resource_key: "gacha/version1/rare/rare_2.webp".into(),
            signed_url: "https://signed/rare_2".into(),
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["rarity"], "rare");
        assert_eq!(json["item"]["id"], 2);
        assert_eq!(json["item"]["assetPath"], "/gacha/version1/rare/rare_2.webp");
        assert_eq!(json["resourceKey"], "gacha/version1/rare/rare_2.webp");
        assert_eq!(json["signedUrl"], "https://signed/rare_2");
    }

    #[test]
    fn failure_serializes_kind_name() {
        let outcome = DrawOutcome::failure(FailureKind::SigningFailure, "no url");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["kind"], "SigningFailure");
        assert_eq!(json["message"], "no url");
    }

    #[test]
    fn failure_kind_accessor() {
        assert_eq!(
            DrawOutcome::failure(FailureKind::Cancelled, "x").failure_kind(),
            Some(FailureKind::Cancelled)
        );
        assert!(!DrawOutcome::failure(FailureKind::Unknown, "x").is_success());
    }
}
