//! Contract of the backend that mints signed asset URLs.

use std::collections::HashMap;

use async_trait::async_trait;

/// Resource key -> signed URL. Keys the backend could not sign are absent.
pub type SignedUrls = HashMap<String, String>;

/// Errors raised by a signing backend for a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The backend could not be reached or failed every request.
    #[error("Signing backend unavailable: {0}")]
    Unavailable(String),

    /// The signer itself is misconfigured.
    #[error("Invalid signer configuration: {0}")]
    Config(String),
}

/// A backend able to sign a batch of resource keys.
///
/// Implementations may omit keys they could not sign from an otherwise
/// successful result; callers treat absent keys as unsigned.
#[async_trait]
pub trait ResourceSigner: Send + Sync {
    async fn sign_resource_keys(&self, keys: &[String]) -> Result<SignedUrls, SigningError>;
}
