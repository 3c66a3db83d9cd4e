use std::time::Duration;

/// Default lifetime of a cached signed URL (seconds).
pub const DEFAULT_SIGNED_URL_TTL_SECS: i64 = 3600;

/// Default lifetime of a cached signing failure (seconds).
pub const DEFAULT_NEGATIVE_TTL_SECS: i64 = 30;

/// Default window before expiry in which an entry is refreshed (seconds).
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;

/// Default expiry embedded in presigned URLs (seconds). Kept above the cache
/// TTL so a cached URL never outlives its signature.
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3900;

/// TTL settings of the signed URL cache.
///
/// `positive_ttl` should exceed `refresh_threshold`; otherwise every
/// resolved entry is immediately due for refresh.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of an entry holding a URL.
    pub positive_ttl: chrono::Duration,
    /// Lifetime of an entry recording a failed or missing signature.
    pub negative_ttl: chrono::Duration,
    /// Entries with a URL are refreshed once they are this close to expiry.
    pub refresh_threshold: chrono::Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            positive_ttl: chrono::Duration::seconds(DEFAULT_SIGNED_URL_TTL_SECS),
            negative_ttl: chrono::Duration::seconds(DEFAULT_NEGATIVE_TTL_SECS),
            refresh_threshold: chrono::Duration::seconds(DEFAULT_REFRESH_THRESHOLD_SECS),
        }
    }
}

impl CacheConfig {
    /// Load cache settings from environment variables with defaults.
    ///
    /// | Env Var                             | Default |
    /// |-------------------------------------|---------|
    /// | `SIGNED_URL_TTL_SECS`               | `3600`  |
    /// | `SIGNED_URL_NEGATIVE_TTL_SECS`      | `30`    |
    /// | `SIGNED_URL_REFRESH_THRESHOLD_SECS` | `300`   |
    pub fn from_env() -> Self {
        let positive_ttl = env_secs("SIGNED_URL_TTL_SECS", DEFAULT_SIGNED_URL_TTL_SECS);
        let negative_ttl = env_secs("SIGNED_URL_NEGATIVE_TTL_SECS", DEFAULT_NEGATIVE_TTL_SECS);
        let refresh_threshold = env_secs(
            "SIGNED_URL_REFRESH_THRESHOLD_SECS",
            DEFAULT_REFRESH_THRESHOLD_SECS,
        );

        if positive_ttl <= refresh_threshold {
            tracing::warn!(
                positive_ttl_secs = positive_ttl.num_seconds(),
                refresh_threshold_secs = refresh_threshold.num_seconds(),
                "Signed URL TTL does not exceed the refresh threshold; every lookup will refetch",
            );
        }

        Self {
            positive_ttl,
            negative_ttl,
            refresh_threshold,
        }
    }
}

/// Settings for the S3 presigning backend.
#[derive(Debug, Clone)]
pub struct S3SignerConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2). Enables
    /// path-style addressing.
    pub endpoint_url: Option<String>,
    pub presign_expiry: Duration,
}

impl S3SignerConfig {
    /// Load signer settings from environment variables.
    ///
    /// | Env Var                  | Default       |
    /// |--------------------------|---------------|
    /// | `ASSET_BUCKET`           | (required)    |
    /// | `ASSET_REGION`           | `us-east-1`   |
    /// | `ASSET_ENDPOINT_URL`     | unset         |
    /// | `SIGNED_URL_EXPIRY_SECS` | `3900`        |
    pub fn from_env() -> Self {
        let bucket = std::env::var("ASSET_BUCKET").expect("ASSET_BUCKET must be set");

        let region = std::env::var("ASSET_REGION").unwrap_or_else(|_| "us-east-1".into());

        let endpoint_url = std::env::var("ASSET_ENDPOINT_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let presign_expiry_secs: u64 = std::env::var("SIGNED_URL_EXPIRY_SECS")
            .unwrap_or_else(|_| DEFAULT_PRESIGN_EXPIRY_SECS.to_string())
            .parse()
            .expect("SIGNED_URL_EXPIRY_SECS must be a valid u64");

        Self {
            bucket,
            region,
            endpoint_url,
            presign_expiry: Duration::from_secs(presign_expiry_secs),
        }
    }
}

fn env_secs(name: &str, default: i64) -> chrono::Duration {
    let secs: i64 = std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid number of seconds"));
    chrono::Duration::seconds(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_ttl_above_threshold() {
        let config = CacheConfig::default();
        assert!(config.positive_ttl > config.refresh_threshold);
        assert!(config.negative_ttl < config.refresh_threshold);
    }

    #[test]
    fn presign_expiry_outlives_cache_ttl() {
        let config = CacheConfig::default();
        assert!(DEFAULT_PRESIGN_EXPIRY_SECS as i64 > config.positive_ttl.num_seconds());
    }
}
