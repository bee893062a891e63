// ABOUTME: Diff entries reported when comparing two workflow runs
// ABOUTME: Each entry is classified by origin and kind and carries rendered values

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOrigin {
    Specification,
    Parameters,
    Workspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

impl DiffOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffOrigin::Specification => "specification",
            DiffOrigin::Parameters => "parameters",
            DiffOrigin::Workspace => "workspace",
        }
    }
}

impl DiffKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffKind::Added => "added",
            DiffKind::Removed => "removed",
            DiffKind::Changed => "changed",
        }
    }

    /// Symbol used in unified-diff style output
    pub fn marker(&self) -> char {
        match self {
            DiffKind::Added => '+',
            DiffKind::Removed => '-',
            DiffKind::Changed => '~',
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            DiffKind::Added => DiffKind::Removed,
            DiffKind::Removed => DiffKind::Added,
            DiffKind::Changed => DiffKind::Changed,
        }
    }
}

impl fmt::Display for DiffOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub origin: DiffOrigin,
    pub kind: DiffKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl DiffEntry {
    pub fn added(origin: DiffOrigin, path: impl Into<String>, after: Option<String>) -> Self {
        Self {
            origin,
            kind: DiffKind::Added,
            path: path.into(),
            before: None,
            after,
        }
    }

    pub fn removed(origin: DiffOrigin, path: impl Into<String>, before: Option<String>) -> Self {
        Self {
            origin,
            kind: DiffKind::Removed,
            path: path.into(),
            before,
            after: None,
        }
    }

    pub fn changed(
        origin: DiffOrigin,
        path: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            origin,
            kind: DiffKind::Changed,
            path: path.into(),
            before: Some(before.into()),
            after: Some(after.into()),
        }
    }

    /// The entry the reverse comparison would produce
    pub fn inverted(&self) -> Self {
        Self {
            origin: self.origin,
            kind: self.kind.inverted(),
            path: self.path.clone(),
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_swaps_polarity_and_values() {
        let entry = DiffEntry::added(DiffOrigin::Workspace, "data/a.root", Some("12 B".to_string()));
        let inverted = entry.inverted();
        assert_eq!(inverted.kind, DiffKind::Removed);
        assert_eq!(inverted.before.as_deref(), Some("12 B"));
        assert_eq!(inverted.after, None);
        assert_eq!(inverted.inverted(), entry);
    }
}
