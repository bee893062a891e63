// ABOUTME: Ordered ignore rule sets with last-match-wins evaluation
// ABOUTME: Excluded directories prune their whole subtree before rules are consulted

use std::collections::HashMap;
use tracing::debug;

use super::error::Result;
use super::pattern::IgnoreRule;

/// Ordered ignore rules where the last matching rule decides
///
/// A path no rule matches is included. A file below an excluded directory
/// stays excluded even when a later rule re-includes the file itself.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile raw patterns; errors carry the pattern's index in `patterns`
    pub fn compile<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .enumerate()
            .map(|(index, pattern)| IgnoreRule::compile(pattern.as_ref(), index))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Parse ignore-file text; errors carry the zero-based line index
    pub fn parse(text: &str) -> Result<Self> {
        let mut rules = Vec::new();

        for (line_index, line) in text.lines().enumerate() {
            let line = trim_unescaped_end(line);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            rules.push(IgnoreRule::compile(line, line_index)?);
        }

        debug!("Parsed {} ignore rules", rules.len());
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_excluded(&self, path: &str, is_dir: bool) -> bool {
        self.excluded_with(path, is_dir, &mut HashMap::new())
    }

    /// Keep the entries whose path is not excluded; `path_of` names a file, never a directory
    ///
    /// Directory decisions are shared across the entries of one call.
    pub fn retain_included<T, F>(&self, entries: impl IntoIterator<Item = T>, path_of: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        let mut directories = HashMap::new();
        entries
            .into_iter()
            .filter(|entry| !self.excluded_with(path_of(entry), false, &mut directories))
            .collect()
    }

    fn excluded_with(
        &self,
        path: &str,
        is_dir: bool,
        directories: &mut HashMap<String, bool>,
    ) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let path = path.trim_start_matches("./").trim_matches('/');

        for (end, _) in path.match_indices('/') {
            let ancestor = &path[..end];
            let excluded = match directories.get(ancestor) {
                Some(excluded) => *excluded,
                None => {
                    let excluded = self.decide(ancestor, true);
                    directories.insert(ancestor.to_string(), excluded);
                    excluded
                }
            };
            if excluded {
                return true;
            }
        }

        self.decide(path, is_dir)
    }

    /// Reverse scan: the most recent matching rule decides
    fn decide(&self, path: &str, is_dir: bool) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(path, is_dir))
            .map_or(false, |rule| !rule.negated)
    }
}

/// Drop trailing whitespace; the first whitespace character after a trailing backslash is kept
fn trim_unescaped_end(line: &str) -> &str {
    let trimmed = line.trim_end();
    if !trimmed.ends_with('\\') {
        return trimmed;
    }
    let escaped = line[trimmed.len()..].chars().next().map_or(0, char::len_utf8);
    &line[..trimmed.len() + escaped]
}
