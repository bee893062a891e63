// ABOUTME: Workspace listings mapping relative paths to size and modification time
// ABOUTME: Listings come from a storage client or from scanning a local directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::ignore::IgnoreRuleSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

impl FileStat {
    pub fn new(size: u64, last_modified: DateTime<Utc>) -> Self {
        Self {
            size,
            last_modified,
        }
    }
}

impl fmt::Display for FileStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={} modified={}",
            self.size,
            self.last_modified.to_rfc3339()
        )
    }
}

/// Files of a workspace keyed by relative path, in path order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceListing {
    entries: BTreeMap<String, FileStat>,
}

impl WorkspaceListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// List every regular file below `root`, keyed by its `/`-separated relative path
    pub fn scan(root: &Path) -> io::Result<Self> {
        let mut listing = Self::new();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let path = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let metadata = entry.metadata()?;
            let last_modified: DateTime<Utc> = metadata.modified()?.into();
            listing.insert(path, FileStat::new(metadata.len(), last_modified));
        }

        debug!("Scanned {} files below {}", listing.len(), root.display());
        Ok(listing)
    }

    pub fn insert(&mut self, path: impl Into<String>, stat: FileStat) {
        self.entries.insert(path.into(), stat);
    }

    pub fn get(&self, path: &str) -> Option<&FileStat> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order
    pub fn iter(&self) -> btree_map::Iter<'_, String, FileStat> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Copy of the listing without the paths `rules` exclude
    pub fn without_ignored(&self, rules: &IgnoreRuleSet) -> Self {
        rules
            .retain_included(self.iter(), |(path, _)| path.as_str())
            .into_iter()
            .map(|(path, stat)| (path.clone(), stat.clone()))
            .collect()
    }
}

impl FromIterator<(String, FileStat)> for WorkspaceListing {
    fn from_iter<T: IntoIterator<Item = (String, FileStat)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a WorkspaceListing {
    type Item = (&'a String, &'a FileStat);
    type IntoIter = btree_map::Iter<'a, String, FileStat>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
