// ABOUTME: Error type for a single registry lookup
// ABOUTME: Lookup errors are recorded per image and never abort a validation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryLookupError {
    #[error("Environment image {image} does not exist in {registry}")]
    NotFound { image: String, registry: String },

    #[error("Access to environment image {image} in {registry} was denied (HTTP {status})")]
    Unauthorized {
        image: String,
        registry: String,
        status: u16,
    },

    #[error("Existence of environment image {image} in {registry} could not be verified: {reason}")]
    Unavailable {
        image: String,
        registry: String,
        reason: String,
    },
}

impl RegistryLookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryLookupError::NotFound { .. })
    }

    /// Whether retrying the same lookup later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, RegistryLookupError::Unavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, RegistryLookupError>;
