// ABOUTME: Yadage workflow reader flattening nested stages into steps
// ABOUTME: Only docker-encapsulated environments are accepted

use serde_yaml::Value;
use std::collections::BTreeSet;

use crate::parser::error::{Result, SpecError};
use crate::parser::fields::{
    child, index, mapping, optional_string, required, required_string, scalar_string, sequence,
};
use crate::parser::spec::{Resources, Step};

const SUPPORTED_ENVIRONMENT: &str = "docker-encapsulated";

pub fn read_steps(specification: &Value, path: &str) -> Result<Vec<Step>> {
    let stages_path = child(path, "stages");
    let stages = sequence(required(specification, "stages", path)?, &stages_path)?;

    let mut steps = Vec::new();
    collect_stages(stages, &stages_path, &mut steps)?;
    Ok(steps)
}

/// Depth-first: a nested workflow's stages come before the stage's own step
fn collect_stages(stages: &[Value], path: &str, steps: &mut Vec<Step>) -> Result<()> {
    for (idx, stage) in stages.iter().enumerate() {
        let stage_path = index(path, idx);
        mapping(stage, &stage_path)?;

        let name = required_string(stage, "name", &stage_path)?;
        let scheduler = required(stage, "scheduler", &stage_path)?;
        let scheduler_path = child(&stage_path, "scheduler");
        mapping(scheduler, &scheduler_path)?;

        if let Some(workflow) = scheduler.get("workflow") {
            let workflow_path = child(&scheduler_path, "workflow");
            if let Some(nested) = workflow.get("stages") {
                let nested_path = child(&workflow_path, "stages");
                collect_stages(sequence(nested, &nested_path)?, &nested_path, steps)?;
            }
            continue;
        }

        let step = required(scheduler, "step", &scheduler_path)?;
        let step_path = child(&scheduler_path, "step");

        let (environment, resources) = read_environment(
            required(step, "environment", &step_path)?,
            &child(&step_path, "environment"),
        )?;

        steps.push(Step {
            name,
            command_template: read_process(step.get("process"), &child(&step_path, "process"))?,
            environment: Some(environment),
            resources,
            bindings: read_bindings(scheduler, &scheduler_path)?,
        });
    }

    Ok(())
}

fn read_process(process: Option<&Value>, path: &str) -> Result<Vec<String>> {
    let Some(process) = process else {
        return Ok(Vec::new());
    };

    for key in ["script", "cmd"] {
        if let Some(command) = optional_string(process, key, path)? {
            return Ok(vec![command]);
        }
    }
    Ok(Vec::new())
}

fn read_environment(environment: &Value, path: &str) -> Result<(String, Resources)> {
    let environment_type = required_string(environment, "environment_type", path)?;
    if environment_type != SUPPORTED_ENVIRONMENT {
        return Err(SpecError::InvalidValue {
            path: child(path, "environment_type"),
            reason: format!(
                "only \"{}\" environments are supported, found \"{}\"",
                SUPPORTED_ENVIRONMENT, environment_type
            ),
        });
    }

    let image = required_string(environment, "image", path)?;
    let image = match optional_string(environment, "imagetag", path)? {
        Some(tag) => format!("{}:{}", image, tag),
        None => image,
    };

    let mut resources = Resources::default();
    if let Some(entries) = environment.get("resources") {
        let resources_path = child(path, "resources");
        for (idx, entry) in sequence(entries, &resources_path)?.iter().enumerate() {
            let entry_path = index(&resources_path, idx);
            if let Some(uid) = entry.get("kubernetes_uid") {
                resources.kubernetes_uid =
                    Some(uid.as_i64().ok_or_else(|| SpecError::InvalidType {
                        path: child(&entry_path, "kubernetes_uid"),
                        expected: "an integer",
                    })?);
            }
            if let Some(limit) = optional_string(entry, "kubernetes_memory_limit", &entry_path)? {
                resources.kubernetes_memory_limit = Some(limit);
            }
            if let Some(backend) = optional_string(entry, "compute_backend", &entry_path)? {
                resources.compute_backend = Some(backend);
            }
        }
    }

    Ok((image, resources))
}

fn read_bindings(scheduler: &Value, path: &str) -> Result<BTreeSet<String>> {
    let Some(parameters) = scheduler.get("parameters") else {
        return Ok(BTreeSet::new());
    };

    let parameters_path = child(path, "parameters");
    let mut bindings = BTreeSet::new();
    for (idx, parameter) in sequence(parameters, &parameters_path)?.iter().enumerate() {
        let key = parameter
            .get("key")
            .and_then(scalar_string)
            .ok_or_else(|| SpecError::MissingField {
                path: child(&index(&parameters_path, idx), "key"),
            })?;
        bindings.insert(key);
    }
    Ok(bindings)
}
