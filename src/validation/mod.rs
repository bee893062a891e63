// ABOUTME: Validation of canonical specifications: parameters, resources and environment images
// ABOUTME: Validators accumulate classified findings instead of failing on the first problem

pub mod environments;
pub mod error;
pub mod image;
pub mod parameters;
pub mod report;
pub mod resources;

pub use environments::{
    EnvironmentReport, EnvironmentValidator, ImageCheck, ImageStatus, ImageWarning, Resolution,
    StepImage,
};
pub use error::{ImageReferenceError, PartialResultError};
pub use image::ImageReference;
pub use parameters::{ParameterAnalyzer, ParameterReport, StepParameters};
pub use report::{has_errors, Finding, Severity};
pub use resources::{ResourceIssue, ResourceReport, ResourceValidator, DEFAULT_COMPUTE_BACKENDS};
