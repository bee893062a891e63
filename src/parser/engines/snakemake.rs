// ABOUTME: Snakemake workflow reader for the expanded rule list
// ABOUTME: Rules may repeat and fall back to the default Snakemake image

use serde_yaml::Value;
use std::collections::BTreeSet;

use super::step_resources;
use crate::parser::error::Result;
use crate::parser::fields::{child, index, mapping, optional_string, required, sequence, string_list};
use crate::parser::normalizer::NormalizeWarning;
use crate::parser::spec::Step;

pub const DEFAULT_ENVIRONMENT: &str = "docker.io/snakemake/snakemake:v6.8.0";

pub fn read_steps(
    specification: &Value,
    path: &str,
    warnings: &mut Vec<NormalizeWarning>,
) -> Result<Vec<Step>> {
    let steps_path = child(path, "steps");
    let raw_steps = sequence(required(specification, "steps", path)?, &steps_path)?;

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (idx, raw) in raw_steps.iter().enumerate() {
        let step_path = index(&steps_path, idx);
        mapping(raw, &step_path)?;

        let name = optional_string(raw, "name", &step_path)?
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| idx.to_string());

        let environment = match optional_string(raw, "environment", &step_path)? {
            Some(image) if !image.trim().is_empty() => image,
            _ => {
                warnings.push(NormalizeWarning::DefaultEnvironment {
                    step: name.clone(),
                    image: DEFAULT_ENVIRONMENT.to_string(),
                });
                DEFAULT_ENVIRONMENT.to_string()
            }
        };

        steps.push(Step {
            name,
            command_template: string_list(raw.get("commands"), &child(&step_path, "commands"))?,
            environment: Some(environment),
            resources: step_resources(raw, &step_path)?,
            bindings: BTreeSet::new(),
        });
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_environment_uses_default_image() {
        let specification: Value = serde_yaml::from_str(
            r#"
job_dependencies: {all: [plot]}
steps:
  - {name: plot, environment: "", commands: ["python plot.py --n {config[n]}"]}
  - {name: plot, environment: "python:3.12", commands: ["python plot.py"]}
"#,
        )
        .unwrap();

        let mut warnings = Vec::new();
        let steps = read_steps(&specification, "workflow.specification", &mut warnings).unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].environment.as_deref(), Some(DEFAULT_ENVIRONMENT));
        assert_eq!(steps[1].environment.as_deref(), Some("python:3.12"));
        assert_eq!(
            warnings,
            vec![NormalizeWarning::DefaultEnvironment {
                step: "plot".to_string(),
                image: DEFAULT_ENVIRONMENT.to_string(),
            }]
        );
    }
}
