// ABOUTME: Ignore-file pattern matcher for workspace paths
// ABOUTME: Rules follow dotfile-ignore syntax with last-match-wins and directory pruning

pub mod error;
pub mod pattern;
pub mod rules;

pub use error::{PatternError, Result};
pub use pattern::IgnoreRule;
pub use rules::IgnoreRuleSet;
