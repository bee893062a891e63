// ABOUTME: Parser module for workflow specification documents
// ABOUTME: Exports the canonical model, the normalizer and per-engine readers

pub mod engines;
pub mod error;
pub(crate) mod fields;
pub mod normalizer;
pub mod spec;

pub use error::{Result, SpecError};
pub use normalizer::{detect_engine, NormalizeWarning, Normalized, SpecNormalizer};
pub use spec::{CanonicalSpec, Engine, Manifest, Resources, Step};
