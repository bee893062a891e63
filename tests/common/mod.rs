// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides specification builders, temp workspaces and a fake registry

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

use wfcheck::parser::{CanonicalSpec, SpecNormalizer};
use wfcheck::registry::{RegistryLookup, RegistryLookupError};
use wfcheck::validation::ImageReference;

/// Builds serial REANA specification documents
pub struct SerialSpecBuilder {
    parameters: BTreeMap<String, String>,
    steps: Vec<TestStep>,
    input_files: Vec<String>,
    output_files: Vec<String>,
}

pub struct TestStep {
    pub name: String,
    pub environment: String,
    pub commands: Vec<String>,
    pub resources: Vec<(String, String)>,
}

impl SerialSpecBuilder {
    pub fn new() -> Self {
        Self {
            parameters: BTreeMap::new(),
            steps: Vec::new(),
            input_files: Vec::new(),
            output_files: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.parameters.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_step(mut self, name: &str, environment: &str, commands: &[&str]) -> Self {
        self.steps.push(TestStep {
            name: name.to_string(),
            environment: environment.to_string(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
            resources: Vec::new(),
        });
        self
    }

    /// Adds a resource key such as `compute_backend` to the last step
    pub fn with_resource(mut self, key: &str, value: &str) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.resources.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn with_input_file(mut self, path: &str) -> Self {
        self.input_files.push(path.to_string());
        self
    }

    pub fn with_output_file(mut self, path: &str) -> Self {
        self.output_files.push(path.to_string());
        self
    }

    pub fn to_yaml(&self) -> String {
        let mut yaml = String::from("inputs:\n");

        if !self.input_files.is_empty() {
            yaml.push_str("  files:\n");
            for file in &self.input_files {
                yaml.push_str(&format!("    - {}\n", file));
            }
        }
        if !self.parameters.is_empty() {
            yaml.push_str("  parameters:\n");
            for (name, value) in &self.parameters {
                yaml.push_str(&format!("    {}: {}\n", name, value));
            }
        } else {
            yaml.push_str("  parameters: {}\n");
        }

        yaml.push_str("workflow:\n  type: serial\n  specification:\n    steps:\n");
        for step in &self.steps {
            yaml.push_str(&format!("      - name: {}\n", step.name));
            yaml.push_str(&format!("        environment: '{}'\n", step.environment));
            yaml.push_str("        commands:\n");
            for command in &step.commands {
                yaml.push_str(&format!("          - '{}'\n", command.replace('\'', "''")));
            }
            for (key, value) in &step.resources {
                yaml.push_str(&format!("        {}: {}\n", key, value));
            }
        }

        if !self.output_files.is_empty() {
            yaml.push_str("outputs:\n  files:\n");
            for file in &self.output_files {
                yaml.push_str(&format!("    - {}\n", file));
            }
        }

        yaml
    }

    pub fn build(&self) -> CanonicalSpec {
        SpecNormalizer::new()
            .normalize_str(&self.to_yaml())
            .expect("builder produces a valid specification")
            .spec
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, contents).expect("Failed to write file");
        path
    }
}

/// In-memory registry that counts lookups and can be slowed down
pub struct CountingLookup {
    existing: HashSet<String>,
    unavailable: HashSet<String>,
    delay: Option<Duration>,
    image_delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

impl CountingLookup {
    pub fn new() -> Self {
        Self {
            existing: HashSet::new(),
            unavailable: HashSet::new(),
            delay: None,
            image_delays: HashMap::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// `image` is a fully-qualified reference such as `docker.io/library/python:3.12`
    pub fn with_existing(mut self, image: &str) -> Self {
        self.existing.insert(image.to_string());
        self
    }

    pub fn with_unavailable(mut self, image: &str) -> Self {
        self.unavailable.insert(image.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Overrides the shared delay for one fully-qualified image
    pub fn with_delay_for(mut self, image: &str, delay: Duration) -> Self {
        self.image_delays.insert(image.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    /// Images in the order their lookups finished
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryLookup for CountingLookup {
    async fn lookup(&self, image: &ImageReference) -> Result<bool, RegistryLookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.seen.lock().unwrap().push(image.to_string());

        let name = image.to_string();
        if let Some(delay) = self.image_delays.get(&name).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().unwrap().push(name.clone());

        if self.unavailable.contains(&name) {
            return Err(RegistryLookupError::Unavailable {
                image: name,
                registry: image.registry.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.existing.contains(&name))
    }
}
