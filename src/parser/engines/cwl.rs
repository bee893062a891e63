// ABOUTME: CWL workflow reader for packed ($graph) and single-process documents
// ABOUTME: Each command line tool becomes one step, images come from DockerRequirement

use serde_yaml::Value;
use std::collections::BTreeSet;

use crate::parser::error::{Result, SpecError};
use crate::parser::fields::{child, index, optional_string, scalar_string, sequence, string_list};
use crate::parser::spec::{Resources, Step};

const DOCKER_REQUIREMENT: &str = "DockerRequirement";

pub fn read_steps(specification: &Value, path: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();

    match specification.get("$graph") {
        Some(graph) => {
            let graph_path = child(path, "$graph");
            let processes = sequence(graph, &graph_path)?;
            let inherited = workflow_image(processes, &graph_path)?;
            for (idx, process) in processes.iter().enumerate() {
                if let Some(mut step) = read_tool(process, idx, &index(&graph_path, idx))? {
                    if step.environment.is_none() {
                        step.environment = inherited.clone();
                    }
                    steps.push(step);
                }
            }
        }
        None => {
            if let Some(step) = read_tool(specification, 0, path)? {
                steps.push(step);
            }
        }
    }

    Ok(steps)
}

fn is_command_line_tool(process: &Value) -> bool {
    process.get("baseCommand").is_some()
        || process.get("class").and_then(Value::as_str) == Some("CommandLineTool")
}

fn is_workflow(process: &Value) -> bool {
    process.get("class").and_then(Value::as_str) == Some("Workflow")
}

/// Image declared on the first `Workflow` entry that has one; tools without their own inherit it
fn workflow_image(processes: &[Value], path: &str) -> Result<Option<String>> {
    for (idx, process) in processes.iter().enumerate() {
        if !is_workflow(process) {
            continue;
        }
        if let Some(image) = process_image(process, &index(path, idx))? {
            return Ok(Some(image));
        }
    }
    Ok(None)
}

/// `requirements` take precedence over `hints`
fn process_image(process: &Value, path: &str) -> Result<Option<String>> {
    match docker_pull(process.get("requirements"), &child(path, "requirements"))? {
        Some(image) => Ok(Some(image)),
        None => docker_pull(process.get("hints"), &child(path, "hints")),
    }
}

fn read_tool(process: &Value, idx: usize, path: &str) -> Result<Option<Step>> {
    if !is_command_line_tool(process) {
        return Ok(None);
    }

    let name = optional_string(process, "id", path)?
        .map(|id| local_name(&id).to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| idx.to_string());

    let mut command_template = string_list(process.get("baseCommand"), &child(path, "baseCommand"))?;
    command_template.extend(read_arguments(process.get("arguments"), &child(path, "arguments"))?);

    let environment = process_image(process, path)?;

    Ok(Some(Step {
        name,
        command_template,
        environment,
        resources: Resources::default(),
        bindings: read_inputs(process.get("inputs")),
    }))
}

/// `#main/fit` and `file.cwl#fit` both name the tool `fit`
fn local_name(id: &str) -> &str {
    id.rsplit(['#', '/']).next().unwrap_or(id)
}

fn read_arguments(arguments: Option<&Value>, path: &str) -> Result<Vec<String>> {
    let Some(arguments) = arguments else {
        return Ok(Vec::new());
    };

    let mut rendered = Vec::new();
    for (idx, argument) in sequence(arguments, path)?.iter().enumerate() {
        if let Some(text) = scalar_string(argument) {
            rendered.push(text);
            continue;
        }

        let argument_path = index(path, idx);
        if !argument.is_mapping() {
            return Err(SpecError::InvalidType {
                path: argument_path,
                expected: "a scalar or a mapping",
            });
        }
        if let Some(prefix) = optional_string(argument, "prefix", &argument_path)? {
            rendered.push(prefix);
        }
        if let Some(value_from) = optional_string(argument, "valueFrom", &argument_path)? {
            rendered.push(value_from);
        }
    }
    Ok(rendered)
}

/// Requirements appear either as a list of `{class: ...}` entries or as a mapping keyed by class
fn docker_pull(requirements: Option<&Value>, path: &str) -> Result<Option<String>> {
    match requirements {
        Some(Value::Sequence(entries)) => {
            for (idx, entry) in entries.iter().enumerate() {
                if entry.get("class").and_then(Value::as_str) == Some(DOCKER_REQUIREMENT) {
                    return optional_string(entry, "dockerPull", &index(path, idx));
                }
            }
            Ok(None)
        }
        Some(Value::Mapping(_)) => match requirements.and_then(|r| r.get(DOCKER_REQUIREMENT)) {
            Some(entry) => optional_string(entry, "dockerPull", &child(path, DOCKER_REQUIREMENT)),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

fn read_inputs(inputs: Option<&Value>) -> BTreeSet<String> {
    match inputs {
        Some(Value::Sequence(entries)) => entries
            .iter()
            .filter_map(|entry| entry.get("id").and_then(scalar_string))
            .map(|id| local_name(&id).to_string())
            .collect(),
        Some(Value::Mapping(entries)) => entries
            .keys()
            .filter_map(scalar_string)
            .map(|id| local_name(&id).to_string())
            .collect(),
        _ => BTreeSet::new(),
    }
}
