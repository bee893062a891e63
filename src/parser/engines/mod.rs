// ABOUTME: Engine-specific readers converging on the canonical step list
// ABOUTME: Dispatches on the engine kind and detects engines from document markers

pub mod cwl;
pub mod serial;
pub mod snakemake;
pub mod yadage;

use serde_yaml::Value;

use super::error::Result;
use super::fields::{child, optional_string};
use super::normalizer::NormalizeWarning;
use super::spec::{Engine, Resources, Step};

/// Read the steps of `specification` according to `engine`
pub fn read_steps(
    engine: Engine,
    specification: &Value,
    path: &str,
    warnings: &mut Vec<NormalizeWarning>,
) -> Result<Vec<Step>> {
    match engine {
        Engine::Serial => serial::read_steps(specification, path),
        Engine::Cwl => cwl::read_steps(specification, path),
        Engine::Yadage => yadage::read_steps(specification, path),
        Engine::Snakemake => snakemake::read_steps(specification, path, warnings),
    }
}

/// Whether the specification carries the marker fields of `engine`
pub fn has_markers(engine: Engine, specification: &Value) -> bool {
    let has = |key: &str| specification.get(key).is_some();
    match engine {
        Engine::Serial => has("steps") && !has("job_dependencies"),
        Engine::Cwl => has("$graph") || has("cwlVersion") || has("class"),
        Engine::Yadage => has("stages"),
        Engine::Snakemake => has("job_dependencies"),
    }
}

/// Resource hints written directly on a step mapping (Serial, Snakemake)
pub(crate) fn step_resources(step: &Value, path: &str) -> Result<Resources> {
    let kubernetes_uid = match step.get("kubernetes_uid") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_i64().ok_or_else(|| {
            super::error::SpecError::InvalidType {
                path: child(path, "kubernetes_uid"),
                expected: "an integer",
            }
        })?),
    };

    Ok(Resources {
        compute_backend: optional_string(step, "compute_backend", path)?,
        kubernetes_memory_limit: optional_string(step, "kubernetes_memory_limit", path)?,
        kubernetes_uid,
    })
}
