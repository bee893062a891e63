// ABOUTME: Canonical, engine-agnostic model of a workflow specification
// ABOUTME: Defines the engine enumeration, steps, resource hints and file manifests

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Serial,
    Cwl,
    Yadage,
    Snakemake,
}

impl Engine {
    /// Detection priority order
    pub const ALL: [Engine; 4] = [
        Engine::Serial,
        Engine::Cwl,
        Engine::Yadage,
        Engine::Snakemake,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Serial => "serial",
            Engine::Cwl => "cwl",
            Engine::Yadage => "yadage",
            Engine::Snakemake => "snakemake",
        }
    }

    /// Serial workflows address steps by name, every other engine by position
    pub fn has_unique_step_names(&self) -> bool {
        matches!(self, Engine::Serial)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = value.trim();
        Engine::ALL
            .into_iter()
            .find(|engine| engine.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "unknown workflow engine '{}', expected one of: serial, cwl, yadage, snakemake",
                    value
                )
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub compute_backend: Option<String>,
    pub kubernetes_memory_limit: Option<String>,
    pub kubernetes_uid: Option<i64>,
}

impl Resources {
    pub fn is_empty(&self) -> bool {
        self.compute_backend.is_none()
            && self.kubernetes_memory_limit.is_none()
            && self.kubernetes_uid.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub command_template: Vec<String>,
    /// Container image reference as written; `None` when the engine allows omitting it
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Resources::is_empty")]
    pub resources: Resources,
    /// Names bound locally by the step (Yadage scheduler parameters, CWL tool inputs)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub bindings: BTreeSet<String>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command_template: Vec::new(),
            environment: None,
            resources: Resources::default(),
            bindings: BTreeSet::new(),
        }
    }

    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_template = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_environment(mut self, image: impl Into<String>) -> Self {
        self.environment = Some(image.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub files: BTreeSet<String>,
    #[serde(default)]
    pub directories: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSpec {
    pub engine: Engine,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_yaml::Value>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub inputs: Manifest,
    #[serde(default)]
    pub outputs: Manifest,
}

impl CanonicalSpec {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            parameters: BTreeMap::new(),
            steps: Vec::new(),
            inputs: Manifest::default(),
            outputs: Manifest::default(),
        }
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name.as_str()).collect()
    }

    pub fn get_step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.name == name)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }
}
