// ABOUTME: Registry lookup capability used by the environment image validator
// ABOUTME: Retries, caching and credentials belong to implementations of the trait

pub mod error;
pub mod http;

pub use error::{RegistryLookupError, Result};
pub use http::{parse_bearer_challenge, BearerChallenge, HttpRegistryLookup};

use crate::validation::ImageReference;
use async_trait::async_trait;

#[async_trait]
pub trait RegistryLookup: Send + Sync {
    /// Returns `Ok(false)` when the registry answers that the image does not exist
    async fn lookup(&self, image: &ImageReference) -> Result<bool>;
}
