// ABOUTME: Serial workflow reader
// ABOUTME: Steps run in declaration order and are addressed by unique names

use serde_yaml::Value;
use std::collections::{BTreeSet, HashSet};

use super::step_resources;
use crate::parser::error::{Result, SpecError};
use crate::parser::fields::{child, index, mapping, optional_string, required, required_string, sequence, string_list};
use crate::parser::spec::Step;

pub fn read_steps(specification: &Value, path: &str) -> Result<Vec<Step>> {
    let steps_path = child(path, "steps");
    let raw_steps = sequence(required(specification, "steps", path)?, &steps_path)?;

    let mut seen = HashSet::new();
    let mut steps = Vec::with_capacity(raw_steps.len());

    for (idx, raw) in raw_steps.iter().enumerate() {
        let step_path = index(&steps_path, idx);
        mapping(raw, &step_path)?;

        // Unnamed steps are addressed by position
        let name = optional_string(raw, "name", &step_path)?.unwrap_or_else(|| idx.to_string());
        if name.trim().is_empty() {
            return Err(SpecError::InvalidValue {
                path: child(&step_path, "name"),
                reason: "step name cannot be empty".to_string(),
            });
        }
        if !seen.insert(name.clone()) {
            return Err(SpecError::DuplicateStep {
                path: child(&step_path, "name"),
                name,
            });
        }

        steps.push(Step {
            name,
            command_template: string_list(raw.get("commands"), &child(&step_path, "commands"))?,
            environment: Some(required_string(raw, "environment", &step_path)?),
            resources: step_resources(raw, &step_path)?,
            bindings: BTreeSet::new(),
        });
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(yaml: &str) -> Result<Vec<Step>> {
        let specification: Value = serde_yaml::from_str(yaml).unwrap();
        read_steps(&specification, "workflow.specification")
    }

    #[test]
    fn test_read_serial_steps() {
        let steps = read(
            r#"
steps:
  - name: gendata
    environment: "reanahub/reana-env-root6:6.18.04"
    commands:
      - mkdir -p results
      - root -b -q 'code/gendata.C(${events},"${data}")'
  - environment: "reanahub/reana-env-root6:6.18.04"
    kubernetes_memory_limit: 256Mi
    commands: root -b -q 'code/fitdata.C("${data}","${plot}")'
"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].name, "gendata");
        assert_eq!(steps[0].command_template.len(), 2);
        assert_eq!(steps[1].name, "1");
        assert_eq!(steps[1].command_template.len(), 1);
        assert_eq!(
            steps[1].resources.kubernetes_memory_limit.as_deref(),
            Some("256Mi")
        );
    }

    #[test]
    fn test_duplicate_step_names_are_rejected() {
        let error = read(
            r#"
steps:
  - {name: fit, environment: img, commands: [a]}
  - {name: fit, environment: img, commands: [b]}
"#,
        )
        .unwrap_err();

        assert!(matches!(error, SpecError::DuplicateStep { ref name, .. } if name == "fit"));
        assert_eq!(error.path(), Some("workflow.specification.steps[1].name"));
    }

    #[test]
    fn test_missing_environment() {
        let error = read("steps: [{name: a, commands: [ls]}]").unwrap_err();
        assert_eq!(
            error.path(),
            Some("workflow.specification.steps[0].environment")
        );
    }
}
