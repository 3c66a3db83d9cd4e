//! Signed asset URLs for private bucket objects.
//!
//! - [`signer`] defines the signing backend contract; [`s3`] implements it
//!   with S3 presigned GET requests.
//! - [`cache`] holds [`SignedResourceCache`], which de-duplicates, batches,
//!   and proactively refreshes signing requests.
//! - [`clock`] abstracts wall-clock time so TTL behaviour is testable.

pub mod cache;
pub mod clock;
pub mod config;
pub mod s3;
pub mod signer;

pub use cache::{CacheEntry, SignedResourceCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, S3SignerConfig};
pub use signer::{ResourceSigner, SignedUrls, SigningError};
