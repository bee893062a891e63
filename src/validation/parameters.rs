// ABOUTME: Parameter usage analysis over canonical workflow specifications
// ABOUTME: Reports unresolved, unused and malformed placeholders per step without failing

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use super::report::{Finding, Severity};
use crate::parser::{CanonicalSpec, Engine, Step};

pub const DANGEROUS_OPERATIONS: [&str; 2] = ["sudo ", "cd /"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepParameters {
    pub step: String,
    pub referenced: BTreeSet<String>,
    /// Referenced but neither declared nor bound by the step
    pub unresolved: BTreeSet<String>,
    pub malformed: Vec<String>,
    pub dangerous: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterReport {
    pub steps: Vec<StepParameters>,
    /// Declared parameters no step references
    pub unused: BTreeSet<String>,
}

impl ParameterReport {
    pub fn findings(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        for step in &self.steps {
            for name in &step.unresolved {
                findings.push(
                    Finding::new(
                        Severity::Warning,
                        format!(
                            "Parameter \"{}\" found on step \"{}\" is not defined in input parameters.",
                            name, step.step
                        ),
                    )
                    .for_step(&step.step),
                );
            }
            for fragment in &step.malformed {
                findings.push(
                    Finding::new(
                        Severity::Warning,
                        format!("Malformed parameter placeholder \"{}\".", fragment),
                    )
                    .for_step(&step.step),
                );
            }
            for operation in &step.dangerous {
                findings.push(
                    Finding::new(
                        Severity::Warning,
                        format!(
                            "Operation \"{}\" found in step \"{}\" might be dangerous.",
                            operation, step.step
                        ),
                    )
                    .for_step(&step.step),
                );
            }
        }

        for name in &self.unused {
            findings.push(Finding::new(
                Severity::Warning,
                format!(
                    "Parameter \"{}\" defined in inputs is not used by any step.",
                    name
                ),
            ));
        }

        if findings.is_empty() {
            findings.push(Finding::new(
                Severity::Success,
                "Workflow parameters and commands appear valid.",
            ));
        }

        findings
    }
}

/// Scans step commands for parameter placeholders in the engine's syntax
///
/// Never fails: unresolved, unused and malformed placeholders all end up in
/// the [`ParameterReport`].
#[derive(Debug, Clone)]
pub struct ParameterAnalyzer {
    dangerous_operations: Vec<String>,
}

impl Default for ParameterAnalyzer {
    fn default() -> Self {
        Self {
            dangerous_operations: DANGEROUS_OPERATIONS.iter().map(|op| op.to_string()).collect(),
        }
    }
}

impl ParameterAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dangerous_operations<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dangerous_operations = operations.into_iter().map(Into::into).collect();
        self
    }

    pub fn analyze(&self, spec: &CanonicalSpec) -> ParameterReport {
        let steps: Vec<StepParameters> = spec
            .steps
            .iter()
            .map(|step| self.analyze_step(spec, step))
            .collect();

        let used: BTreeSet<&str> = steps
            .iter()
            .flat_map(|analysis| analysis.referenced.iter())
            .chain(spec.steps.iter().flat_map(|step| step.bindings.iter()))
            .map(String::as_str)
            .collect();

        let unused: BTreeSet<String> = spec
            .parameters
            .keys()
            .filter(|name| !used.contains(name.as_str()))
            .cloned()
            .collect();

        debug!(
            "Analyzed parameters of {} steps: {} unused",
            steps.len(),
            unused.len()
        );

        ParameterReport { steps, unused }
    }

    fn analyze_step(&self, spec: &CanonicalSpec, step: &Step) -> StepParameters {
        let mut analysis = StepParameters {
            step: step.name.clone(),
            ..Default::default()
        };

        for command in &step.command_template {
            for placeholder in placeholders(spec.engine, command) {
                match placeholder {
                    Placeholder::Name(name) => {
                        analysis.referenced.insert(name);
                    }
                    Placeholder::Malformed(fragment) => analysis.malformed.push(fragment),
                }
            }

            for operation in &self.dangerous_operations {
                if command.contains(operation.as_str()) {
                    analysis.dangerous.insert(operation.trim().to_string());
                }
            }
        }

        analysis.unresolved = analysis
            .referenced
            .iter()
            .filter(|name| !spec.has_parameter(name) && !step.bindings.contains(*name))
            .cloned()
            .collect();

        analysis
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Placeholder {
    Name(String),
    Malformed(String),
}

/// Extract placeholders using the engine's syntax
fn placeholders(engine: Engine, command: &str) -> Vec<Placeholder> {
    match engine {
        Engine::Serial => delimited(command, "${", '}')
            .into_iter()
            .map(|raw| raw.and_then(identifier))
            .map(into_placeholder)
            .collect(),
        Engine::Yadage => delimited(command, "{", '}')
            .into_iter()
            .map(|raw| {
                raw.and_then(|inner| {
                    let trimmed = inner.trim_start_matches('{');
                    identifier(trimmed).map_err(|_| inner)
                })
            })
            .map(into_placeholder)
            .collect(),
        Engine::Cwl => delimited(command, "$(", ')')
            .into_iter()
            .filter_map(|raw| match raw {
                Ok(inner) => {
                    let reference = inner.trim().strip_prefix("inputs.")?;
                    let name = reference
                        .split(|c: char| c == '.' || c == '[')
                        .next()
                        .unwrap_or_default();
                    Some(identifier(name).map_err(|_| inner))
                }
                Err(fragment) => Some(Err(fragment)),
            })
            .map(into_placeholder)
            .collect(),
        Engine::Snakemake => delimited(command, "config[", ']')
            .into_iter()
            .map(|raw| {
                raw.and_then(|inner| {
                    let name = inner.trim().trim_matches(|c: char| c == '"' || c == '\'');
                    identifier(name).map_err(|_| inner)
                })
            })
            .map(into_placeholder)
            .collect(),
    }
}

fn into_placeholder(raw: Result<String, String>) -> Placeholder {
    match raw {
        Ok(name) => Placeholder::Name(name),
        Err(fragment) => Placeholder::Malformed(fragment),
    }
}

/// Ok(inner text) for every closed occurrence, Err(fragment) for an unclosed one
fn delimited(text: &str, open: &str, close: char) -> Vec<Result<String, String>> {
    let mut found = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(open) {
        let after = &rest[start + open.len()..];
        match after.find(close) {
            Some(end) => {
                found.push(Ok(after[..end].to_string()));
                rest = after[end + close.len_utf8()..].trim_start_matches(close);
            }
            None => {
                found.push(Err(rest[start..].to_string()));
                break;
            }
        }
    }

    found
}

fn identifier(raw: impl AsRef<str>) -> Result<String, String> {
    let raw = raw.as_ref();
    let name = raw.trim();
    let valid = name
        .chars()
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');

    if valid {
        Ok(name.to_string())
    } else {
        Err(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn names(engine: Engine, command: &str) -> Vec<Placeholder> {
        placeholders(engine, command)
    }

    #[test]
    fn test_serial_placeholders() {
        assert_eq!(
            names(Engine::Serial, "root -b -q 'fit.C(${events},\"${data}\")' $HOME"),
            vec![
                Placeholder::Name("events".to_string()),
                Placeholder::Name("data".to_string())
            ]
        );
        assert_eq!(
            names(Engine::Serial, "echo ${a b} ${open"),
            vec![
                Placeholder::Malformed("a b".to_string()),
                Placeholder::Malformed("${open".to_string())
            ]
        );
    }

    #[test]
    fn test_yadage_double_braces() {
        assert_eq!(
            names(Engine::Yadage, "python fit.py {{input}} -o {outputfile}"),
            vec![
                Placeholder::Name("input".to_string()),
                Placeholder::Name("outputfile".to_string())
            ]
        );
    }

    #[test]
    fn test_cwl_only_reads_inputs() {
        assert_eq!(
            names(Engine::Cwl, "$(inputs.data.path) $(runtime.outdir)"),
            vec![Placeholder::Name("data".to_string())]
        );
    }

    #[test]
    fn test_snakemake_config_lookup() {
        assert_eq!(
            names(Engine::Snakemake, "python run.py {config[\"events\"]} {config[seed]}"),
            vec![
                Placeholder::Name("events".to_string()),
                Placeholder::Name("seed".to_string())
            ]
        );
    }

    #[test]
    fn test_bindings_resolve_and_count_as_use() {
        let mut spec = CanonicalSpec::new(Engine::Yadage);
        spec.parameters.insert("nevents".to_string(), Value::from(100));
        let mut step = Step::new("gen").with_commands(["gen {nevents} {outdir}"]);
        step.bindings.insert("outdir".to_string());
        spec.steps.push(step);

        let report = ParameterAnalyzer::new().analyze(&spec);
        assert!(report.steps[0].unresolved.is_empty());
        assert!(report.unused.is_empty());
    }

    #[test]
    fn test_dangerous_operations() {
        let mut spec = CanonicalSpec::new(Engine::Serial);
        spec.steps
            .push(Step::new("setup").with_commands(["sudo apt-get install -y root", "cd / && ls"]));

        let report = ParameterAnalyzer::new().analyze(&spec);
        let expected: BTreeSet<String> = ["sudo", "cd /"].iter().map(|s| s.to_string()).collect();
        assert_eq!(report.steps[0].dangerous, expected);
    }
}
