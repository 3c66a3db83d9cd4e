//! S3 presigned GET URLs (also works against S3-compatible stores).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;

use crate::config::S3SignerConfig;
use crate::signer::{ResourceSigner, SignedUrls, SigningError};

/// Signs resource keys as presigned `GetObject` requests on one bucket.
#[derive(Debug, Clone)]
pub struct S3Signer {
    client: Client,
    bucket: String,
    expiry: Duration,
}

impl S3Signer {
    pub fn new(client: Client, bucket: impl Into<String>, expiry: Duration) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            expiry,
        }
    }

    /// Build a signer from configuration, resolving credentials through the
    /// default AWS provider chain.
    pub async fn from_config(config: &S3SignerConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint_url,
            "S3 signer configured",
        );

        Self::new(
            Client::from_conf(builder.build()),
            config.bucket.clone(),
            config.presign_expiry,
        )
    }

    async fn presign(&self, key: &str, presigning: PresigningConfig) -> Result<String, String> {
        self.client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map(|request| request.uri().to_string())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ResourceSigner for S3Signer {
    async fn sign_resource_keys(&self, keys: &[String]) -> Result<SignedUrls, SigningError> {
        let presigning = PresigningConfig::expires_in(self.expiry)
            .map_err(|e| SigningError::Config(e.to_string()))?;

        let results = futures::future::join_all(
            keys.iter().map(|key| self.presign(key, presigning.clone())),
        )
        .await;

        let mut urls = HashMap::with_capacity(keys.len());
        let mut failures = 0usize;
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(url) => {
                    urls.insert(key.clone(), url);
                }
                Err(error) => {
                    failures += 1;
                    tracing::warn!(key = %key, %error, "Failed to presign resource key");
                }
            }
        }

        if urls.is_empty() && failures > 0 {
            return Err(SigningError::Unavailable(format!(
                "all {failures} presign requests failed"
            )));
        }

        Ok(urls)
    }
}
