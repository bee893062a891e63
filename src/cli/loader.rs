// ABOUTME: Loads specification documents and ignore files from disk
// ABOUTME: Resolves workflow.file references relative to the specification file

use anyhow::{anyhow, Context, Result};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::ignore::IgnoreRuleSet;

/// Read a specification and inline the workflow file it references
pub fn load_specification(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read specification file {}", path.display()))?;
    let mut document: Value = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse specification file {}", path.display()))?;

    let Some(workflow) = document.get_mut("workflow").and_then(Value::as_mapping_mut) else {
        return Ok(document);
    };

    let has_specification = workflow
        .get("specification")
        .map_or(false, |specification| !specification.is_null());
    if has_specification {
        return Ok(document);
    }

    let Some(file) = workflow.get("file").and_then(Value::as_str) else {
        return Ok(document);
    };

    if workflow.get("type").and_then(Value::as_str) == Some("snakemake") {
        return Err(anyhow!(
            "Snakemake workflow file {} cannot be read; provide the steps under workflow.specification",
            file
        ));
    }

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let workflow_path = base.join(file);
    debug!("Loading workflow file {}", workflow_path.display());

    let contents = fs::read_to_string(&workflow_path)
        .with_context(|| format!("Failed to read workflow file {}", workflow_path.display()))?;
    let specification: Value = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse workflow file {}", workflow_path.display()))?;

    workflow.insert(Value::from("specification"), specification);
    Ok(document)
}

/// Read ignore rules; a missing file means no rules
pub fn load_ignore_rules(path: &Path) -> Result<IgnoreRuleSet> {
    if !path.exists() {
        debug!("No ignore file at {}", path.display());
        return Ok(IgnoreRuleSet::new());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ignore file {}", path.display()))?;
    IgnoreRuleSet::parse(&text)
        .with_context(|| format!("Invalid ignore file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_inline_specification_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reana.yaml");
        fs::write(
            &path,
            "workflow:\n  type: serial\n  specification:\n    steps: []\n",
        )
        .unwrap();

        let document = load_specification(&path).unwrap();
        assert!(document["workflow"]["specification"]["steps"].is_sequence());
    }

    #[test]
    fn test_workflow_file_is_resolved_relative_to_spec() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("workflow")).unwrap();
        fs::write(
            dir.path().join("workflow/main.cwl"),
            "cwlVersion: v1.0\nclass: CommandLineTool\nbaseCommand: echo\n",
        )
        .unwrap();
        let path = dir.path().join("reana.yaml");
        fs::write(&path, "workflow:\n  type: cwl\n  file: workflow/main.cwl\n").unwrap();

        let document = load_specification(&path).unwrap();
        assert_eq!(
            document["workflow"]["specification"]["baseCommand"],
            Value::from("echo")
        );
    }

    #[test]
    fn test_snakemake_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reana.yaml");
        fs::write(&path, "workflow:\n  type: snakemake\n  file: Snakefile\n").unwrap();

        assert!(load_specification(&path).is_err());
    }

    #[test]
    fn test_missing_ignore_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let rules = load_ignore_rules(&dir.path().join(".reanaignore")).unwrap();
        assert!(rules.is_empty());
    }
}
