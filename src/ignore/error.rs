// ABOUTME: Error type for ignore pattern compilation
// ABOUTME: Every variant names the offending pattern, its rule index and position

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Ignore rule {index} is empty")]
    Empty { pattern: String, index: usize },

    #[error("Ignore rule {index} '{pattern}': unsupported character {character:?} at position {position}")]
    UnsupportedCharacter {
        pattern: String,
        index: usize,
        position: usize,
        character: char,
    },

    #[error("Ignore rule {index} '{pattern}': unclosed character class starting at position {position}")]
    UnclosedClass {
        pattern: String,
        index: usize,
        position: usize,
    },

    #[error("Ignore rule {index} '{pattern}': trailing escape at position {position}")]
    TrailingEscape {
        pattern: String,
        index: usize,
        position: usize,
    },

    #[error("Ignore rule {index} '{pattern}': '**' at position {position} must be a whole path segment")]
    MisplacedGlobstar {
        pattern: String,
        index: usize,
        position: usize,
    },

    #[error("Ignore rule {index} '{pattern}' could not be compiled: {source}")]
    Regex {
        pattern: String,
        index: usize,
        #[source]
        source: regex::Error,
    },
}

impl PatternError {
    pub fn pattern(&self) -> &str {
        match self {
            PatternError::Empty { pattern, .. }
            | PatternError::UnsupportedCharacter { pattern, .. }
            | PatternError::UnclosedClass { pattern, .. }
            | PatternError::TrailingEscape { pattern, .. }
            | PatternError::MisplacedGlobstar { pattern, .. }
            | PatternError::Regex { pattern, .. } => pattern,
        }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            PatternError::UnsupportedCharacter { position, .. }
            | PatternError::UnclosedClass { position, .. }
            | PatternError::TrailingEscape { position, .. }
            | PatternError::MisplacedGlobstar { position, .. } => Some(*position),
            PatternError::Empty { .. } | PatternError::Regex { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PatternError>;
