// ABOUTME: Error types for image reference parsing and interrupted validations
// ABOUTME: Reference errors are local rejections that never reach a registry

use thiserror::Error;

use super::environments::EnvironmentReport;
use super::image::ImageReference;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageReferenceError {
    #[error("Environment image reference is empty")]
    Empty,

    #[error("Environment image '{reference}' contains illegal character {character:?} at position {position}")]
    IllegalCharacter {
        reference: String,
        character: char,
        position: usize,
    },

    #[error("Environment image '{reference}' has invalid tag '{tag}'")]
    InvalidTag { reference: String, tag: String },

    #[error("Environment image '{reference}' has invalid repository: {reason}")]
    InvalidRepository { reference: String, reason: String },

    #[error("Environment image '{reference}' has invalid registry '{registry}'")]
    InvalidRegistry { reference: String, registry: String },

    #[error("Environment image '{reference}' is pinned by digest, which is not supported")]
    UnsupportedDigest { reference: String },
}

/// Validation was cut short; finished checks are kept in `report`
#[derive(Error, Debug, Clone)]
#[error(
    "Environment validation interrupted: {} of {} image(s) were not checked",
    .unchecked.len(),
    .report.checks.len()
)]
pub struct PartialResultError {
    pub report: EnvironmentReport,
    pub unchecked: Vec<ImageReference>,
}
