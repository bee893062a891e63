// ABOUTME: Error types for specification parsing and normalization
// ABOUTME: Every variant names the dotted field path of the offending document node

use thiserror::Error;

use super::spec::Engine;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing required field: {path}")]
    MissingField { path: String },

    #[error("Invalid type for '{path}': expected {expected}")]
    InvalidType {
        path: String,
        expected: &'static str,
    },

    #[error("Invalid value for '{path}': {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("Unknown workflow engine '{value}' in '{path}'. Supported engines: serial, cwl, yadage, snakemake")]
    UnknownEngine { path: String, value: String },

    #[error("Requested engine '{requested}' does not match '{declared}' declared in '{path}'")]
    EngineMismatch {
        path: String,
        requested: Engine,
        declared: Engine,
    },

    #[error("Could not detect the workflow engine from '{path}'")]
    UndetectedEngine { path: String },

    #[error("Ambiguous workflow engine in '{path}': document matches {candidates:?}")]
    AmbiguousEngine {
        path: String,
        candidates: Vec<Engine>,
    },

    #[error("Duplicate step name '{name}' in '{path}'")]
    DuplicateStep { path: String, name: String },

    #[error("'{entry}' is declared in both '{path}.files' and '{path}.directories'")]
    ConflictingDeclaration { path: String, entry: String },
}

impl SpecError {
    /// Field path of the node that failed to normalize, if the error has one
    pub fn path(&self) -> Option<&str> {
        match self {
            SpecError::YamlError(_) => None,
            SpecError::MissingField { path }
            | SpecError::InvalidType { path, .. }
            | SpecError::InvalidValue { path, .. }
            | SpecError::UnknownEngine { path, .. }
            | SpecError::EngineMismatch { path, .. }
            | SpecError::UndetectedEngine { path }
            | SpecError::AmbiguousEngine { path, .. }
            | SpecError::DuplicateStep { path, .. }
            | SpecError::ConflictingDeclaration { path, .. } => Some(path),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpecError>;
