// ABOUTME: Output formatters for validation findings and workflow diffs
// ABOUTME: Text output mirrors the client's arrow style, JSON output is structured

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use super::error::Result;
use crate::diff::{DiffEntry, DiffKind, DiffOrigin};
use crate::validation::{Finding, Severity};

/// A titled group of findings, such as parameter or environment checks
#[derive(Debug, Clone, Serialize)]
pub struct FindingSection {
    pub title: String,
    pub findings: Vec<Finding>,
}

impl FindingSection {
    pub fn new(title: impl Into<String>, findings: Vec<Finding>) -> Self {
        Self {
            title: title.into(),
            findings,
        }
    }
}

pub trait OutputFormatter: Send + Sync {
    fn format_validation(&self, sections: &[FindingSection]) -> Result<String>;

    fn format_diff(&self, entries: &[DiffEntry]) -> Result<String>;
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct TextFormatter;

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn new_pretty() -> Self {
        Self { pretty: true }
    }

    fn render(&self, value: &JsonValue) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_validation(&self, sections: &[FindingSection]) -> Result<String> {
        let errors = sections
            .iter()
            .flat_map(|section| &section.findings)
            .filter(|finding| finding.severity == Severity::Error)
            .count();

        self.render(&json!({
            "valid": errors == 0,
            "errors": errors,
            "sections": sections,
        }))
    }

    fn format_diff(&self, entries: &[DiffEntry]) -> Result<String> {
        self.render(&json!({
            "identical": entries.is_empty(),
            "differences": entries,
        }))
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputFormatter for TextFormatter {
    fn format_validation(&self, sections: &[FindingSection]) -> Result<String> {
        let mut output = String::new();

        for section in sections {
            output.push_str(&format!("==> {}\n", section.title));
            for finding in &section.findings {
                output.push_str(&format!(
                    "  -> {}: {}\n",
                    finding.severity.as_str().to_uppercase(),
                    finding.message
                ));
            }
        }

        Ok(output)
    }

    fn format_diff(&self, entries: &[DiffEntry]) -> Result<String> {
        if entries.is_empty() {
            return Ok("==> No differences found.\n".to_string());
        }

        let mut output = String::new();
        let mut current: Option<DiffOrigin> = None;

        for entry in entries {
            if current != Some(entry.origin) {
                output.push_str(&format!("==> Differences in workflow {}\n", entry.origin));
                current = Some(entry.origin);
            }

            output.push_str(&format!("{} {}\n", entry.kind.marker(), entry.path));
            match entry.kind {
                DiffKind::Changed => {
                    if let Some(before) = &entry.before {
                        output.push_str(&format!("    - {}\n", before));
                    }
                    if let Some(after) = &entry.after {
                        output.push_str(&format!("    + {}\n", after));
                    }
                }
                DiffKind::Added | DiffKind::Removed => {
                    if let Some(value) = entry.after.as_ref().or(entry.before.as_ref()) {
                        output.push_str(&format!("    {}\n", value));
                    }
                }
            }
        }

        Ok(output)
    }
}
