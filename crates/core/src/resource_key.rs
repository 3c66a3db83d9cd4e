//! Resource keys: canonical bucket object keys derived from asset paths.
//!
//! An asset path such as `/gacha/version1/rare/rare_3.webp` maps to the key
//! `gacha/version1/rare/rare_3.webp`. The key is what the signed URL cache
//! and the signing backend are addressed by.

use crate::draw_config::ASSET_ROOT;
use crate::error::CoreError;
use crate::types::DbId;

/// Maximum accepted key length (S3 object key limit).
pub const MAX_KEY_LEN: usize = 1024;

/// Prefix of cache keys holding a user's preview linkage for an asset.
pub const PREVIEW_KEY_PREFIX: &str = "preview";

/// Derive the resource key for an asset path.
///
/// Leading slashes are dropped. The remaining path must consist of non-empty
/// segments without `.`/`..`, backslashes, URL schemes, query strings, or
/// control characters.
pub fn derive_resource_key(asset_path: &str) -> Result<String, CoreError> {
    let invalid = |reason: &'static str| CoreError::InvalidResourceKey {
        path: asset_path.to_string(),
        reason,
    };

    let trimmed = asset_path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("path is empty"));
    }
    if trimmed.len() > MAX_KEY_LEN {
        return Err(invalid("path is too long"));
    }
    if trimmed.contains("://") {
        return Err(invalid("path is a URL, not an asset path"));
    }
    if trimmed
        .chars()
        .any(|c| c.is_control() || c == '\\' || c == '?' || c == '#')
    {
        return Err(invalid("path contains a forbidden character"));
    }

    for segment in trimmed.split('/') {
        match segment {
            "" => return Err(invalid("path contains an empty segment")),
            "." | ".." => return Err(invalid("path contains a relative segment")),
            s if s.trim().is_empty() => return Err(invalid("path contains a blank segment")),
            _ => {}
        }
    }

    Ok(trimmed.to_string())
}

/// Derive the resource key for a client-supplied path. Only keys under
/// [`ASSET_ROOT`] are accepted.
pub fn derive_asset_key(asset_path: &str) -> Result<String, CoreError> {
    let key = derive_resource_key(asset_path)?;
    let under_root = key
        .strip_prefix(ASSET_ROOT)
        .is_some_and(|rest| rest.starts_with('/'));
    if !under_root {
        return Err(CoreError::InvalidResourceKey {
            path: asset_path.to_string(),
            reason: "path is outside the asset root",
        });
    }
    Ok(key)
}

/// Cache key of a user's preview linkage for `asset_path`.
pub fn preview_cache_key(user_id: DbId, asset_path: &str) -> String {
    format!("{PREVIEW_KEY_PREFIX}:{user_id}:{asset_path}")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn strips_leading_slash() {
        assert_eq!(
            derive_resource_key("/gacha/version1/rare/rare_3.webp").unwrap(),
            "gacha/version1/rare/rare_3.webp"
        );
    }

    #[test]
    fn relative_path_is_kept() {
        assert_eq!(
            derive_resource_key("gacha/version1/cover.webp").unwrap(),
            "gacha/version1/cover.webp"
        );
    }

    #[test]
    fn empty_paths_rejected() {
        assert_matches!(derive_resource_key(""), Err(CoreError::InvalidResourceKey { .. }));
        assert_matches!(derive_resource_key("///"), Err(CoreError::InvalidResourceKey { .. }));
    }

    #[test]
    fn traversal_rejected() {
        assert!(derive_resource_key("/gacha/../secrets.txt").is_err());
        assert!(derive_resource_key("/gacha/./rare_1.webp").is_err());
    }

    #[test]
    fn double_slash_rejected() {
        assert!(derive_resource_key("/gacha//rare_1.webp").is_err());
    }

    #[test]
    fn urls_and_queries_rejected() {
        assert!(derive_resource_key("https://cdn.example.com/a.webp").is_err());
        assert!(derive_resource_key("/gacha/a.webp?token=1").is_err());
        assert!(derive_resource_key("/gacha/a.webp#frag").is_err());
        assert!(derive_resource_key("gacha\\a.webp").is_err());
    }

    #[test]
    fn blank_segment_rejected() {
        assert!(derive_resource_key("/gacha/ /a.webp").is_err());
    }

    #[test]
    fn overlong_path_rejected() {
        let path = format!("/{}", "a".repeat(MAX_KEY_LEN + 1));
        assert!(derive_resource_key(&path).is_err());
    }

    #[test]
    fn asset_key_accepts_paths_under_root() {
        assert_eq!(
            derive_asset_key("/gacha/version1/rare/rare_3.webp").unwrap(),
            "gacha/version1/rare/rare_3.webp"
        );
    }

    #[test]
    fn asset_key_rejects_paths_outside_root() {
        for path in ["private/members/payroll.pdf", "/gacha", "gachapon/a.webp", "/other/gacha/a.webp"] {
            assert_matches!(
                derive_asset_key(path),
                Err(CoreError::InvalidResourceKey { reason: "path is outside the asset root", .. })
            );
        }
    }

    #[test]
    fn preview_key_format() {
        assert_eq!(
            preview_cache_key(12, "/gacha/version1/rare/rare_3.webp"),
            "preview:12:/gacha/version1/rare/rare_3.webp"
        );
    }
}
