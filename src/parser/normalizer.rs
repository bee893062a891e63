// ABOUTME: Specification normalizer turning raw documents into canonical specs
// ABOUTME: Resolves the engine, applies parameter overrides and reads file manifests

use serde::Serialize;
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

use super::engines;
use super::error::{Result, SpecError};
use super::fields::{child, mapping, required, scalar_string, string_list};
use super::spec::{CanonicalSpec, Engine, Manifest};

const SPECIFICATION_PATH: &str = "workflow.specification";

/// Non-fatal observations made while normalizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizeWarning {
    UnknownOverride { name: String },
    MissingInputs,
    DefaultEnvironment { step: String, image: String },
}

impl fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeWarning::UnknownOverride { name } => write!(
                f,
                "Given parameter \"{}\" is not declared in the specification and was ignored",
                name
            ),
            NormalizeWarning::MissingInputs => {
                write!(f, "Workflow \"inputs\" are missing in the specification")
            }
            NormalizeWarning::DefaultEnvironment { step, image } => write!(
                f,
                "Environment image not specified for step \"{}\", using {}",
                step, image
            ),
        }
    }
}

/// A canonical specification together with the warnings raised while building it
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub spec: CanonicalSpec,
    pub warnings: Vec<NormalizeWarning>,
}

/// Turns a raw REANA document into a [`CanonicalSpec`]
///
/// Normalization is a pure function of the document, the requested engine
/// and the overrides. Structural problems are errors naming the offending
/// field path; everything else is reported as a [`NormalizeWarning`].
#[derive(Debug, Clone, Default)]
pub struct SpecNormalizer {
    engine: Option<Engine>,
    overrides: BTreeMap<String, String>,
}

impl SpecNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine to use when the document does not declare `workflow.type`
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Parameter values replacing the declared ones, given as `name` and raw text
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Parse YAML text and normalize it
    pub fn normalize_str(&self, content: &str) -> Result<Normalized> {
        let document: Value = serde_yaml::from_str(content)?;
        self.normalize(&document)
    }

    pub fn normalize(&self, document: &Value) -> Result<Normalized> {
        mapping(document, "")?;
        let mut warnings = Vec::new();

        let workflow = required(document, "workflow", "")?;
        mapping(workflow, "workflow")?;
        let specification = required(workflow, "specification", "workflow")?;

        let engine = self.resolve_engine(workflow, specification)?;
        debug!("Normalizing {} specification", engine);

        let steps = engines::read_steps(engine, specification, SPECIFICATION_PATH, &mut warnings)?;

        let inputs = document.get("inputs").filter(|inputs| !inputs.is_null());
        if inputs.is_none() {
            warnings.push(NormalizeWarning::MissingInputs);
        }

        let mut parameters = read_parameters(inputs)?;
        self.apply_overrides(&mut parameters, &mut warnings);

        let spec = CanonicalSpec {
            engine,
            parameters,
            steps,
            inputs: read_manifest(inputs, "inputs")?,
            outputs: read_manifest(
                document.get("outputs").filter(|outputs| !outputs.is_null()),
                "outputs",
            )?,
        };

        for warning in &warnings {
            warn!("{}", warning);
        }
        debug!(
            "Normalized {} steps and {} parameters",
            spec.steps.len(),
            spec.parameters.len()
        );

        Ok(Normalized { spec, warnings })
    }

    fn resolve_engine(&self, workflow: &Value, specification: &Value) -> Result<Engine> {
        let declared = match workflow.get("type") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let text = scalar_string(value).unwrap_or_default();
                Some(text.parse::<Engine>().map_err(|_| SpecError::UnknownEngine {
                    path: "workflow.type".to_string(),
                    value: text,
                })?)
            }
        };

        match (declared, self.engine) {
            (Some(declared), Some(requested)) if declared != requested => {
                Err(SpecError::EngineMismatch {
                    path: "workflow.type".to_string(),
                    requested,
                    declared,
                })
            }
            (Some(engine), _) | (None, Some(engine)) => Ok(engine),
            (None, None) => detect_engine(specification),
        }
    }

    fn apply_overrides(
        &self,
        parameters: &mut BTreeMap<String, Value>,
        warnings: &mut Vec<NormalizeWarning>,
    ) {
        for (name, raw) in &self.overrides {
            match parameters.get_mut(name) {
                Some(value) => *value = parse_override(raw),
                None => warnings.push(NormalizeWarning::UnknownOverride { name: name.clone() }),
            }
        }
    }
}

/// Detect the engine from marker fields; more than one match is an error
pub fn detect_engine(specification: &Value) -> Result<Engine> {
    let candidates: Vec<Engine> = Engine::ALL
        .into_iter()
        .filter(|engine| engines::has_markers(*engine, specification))
        .collect();

    match candidates.as_slice() {
        [engine] => Ok(*engine),
        [] => Err(SpecError::UndetectedEngine {
            path: SPECIFICATION_PATH.to_string(),
        }),
        _ => Err(SpecError::AmbiguousEngine {
            path: SPECIFICATION_PATH.to_string(),
            candidates,
        }),
    }
}

/// Overrides keep their YAML scalar type so `0.5` stays a number
fn parse_override(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

fn read_parameters(inputs: Option<&Value>) -> Result<BTreeMap<String, Value>> {
    let Some(raw) = inputs.and_then(|inputs| inputs.get("parameters")) else {
        return Ok(BTreeMap::new());
    };
    if raw.is_null() {
        return Ok(BTreeMap::new());
    }

    let path = "inputs.parameters";
    let mut parameters = BTreeMap::new();
    for (key, value) in mapping(raw, path)? {
        let name = scalar_string(key).ok_or_else(|| SpecError::InvalidType {
            path: path.to_string(),
            expected: "scalar parameter names",
        })?;
        parameters.insert(name, value.clone());
    }
    Ok(parameters)
}

fn read_manifest(section: Option<&Value>, path: &str) -> Result<Manifest> {
    let Some(section) = section else {
        return Ok(Manifest::default());
    };
    mapping(section, path)?;

    let files: BTreeSet<String> = string_list(section.get("files"), &child(path, "files"))?
        .into_iter()
        .collect();
    let directories: BTreeSet<String> =
        string_list(section.get("directories"), &child(path, "directories"))?
            .into_iter()
            .collect();

    if let Some(entry) = files.intersection(&directories).next() {
        return Err(SpecError::ConflictingDeclaration {
            path: path.to_string(),
            entry: entry.clone(),
        });
    }

    Ok(Manifest { files, directories })
}
