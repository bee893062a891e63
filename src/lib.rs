// ABOUTME: Main library module for the wfcheck workflow specification checker
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod diff;
pub mod ignore;
pub mod output;
pub mod parser;
pub mod registry;
pub mod validation;

// Re-export commonly used types
pub use diff::{diff_specs, DiffEntry, DiffKind, DiffOrigin, WorkflowDiff, WorkspaceListing};
pub use ignore::{IgnoreRuleSet, PatternError};
pub use parser::{CanonicalSpec, Engine, SpecError, SpecNormalizer, Step};
pub use registry::{HttpRegistryLookup, RegistryLookup, RegistryLookupError};
pub use validation::{
    EnvironmentReport, EnvironmentValidator, ImageReference, ParameterAnalyzer, ParameterReport,
    PartialResultError,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
