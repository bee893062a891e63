// ABOUTME: Workflow diff engine comparing two canonical specifications
// ABOUTME: Optionally compares workspace listings after applying ignore rules

use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::entry::{DiffEntry, DiffOrigin};
use super::workspace::WorkspaceListing;
use crate::ignore::IgnoreRuleSet;
use crate::parser::{CanonicalSpec, Engine, Manifest, Resources, Step};

/// Compares two canonical specifications, and optionally their workspaces
///
/// Entries are emitted in a fixed order: engine, steps, input and output
/// manifests, parameters, then workspace files. Swapping `a` and `b` yields
/// the same entries with added and removed exchanged.
///
/// ```ignore
/// let entries = WorkflowDiff::new(&a, &b)
///     .with_workspaces(&listing_a, &listing_b)
///     .with_ignore(&rules)
///     .compute();
/// ```
pub struct WorkflowDiff<'a> {
    a: &'a CanonicalSpec,
    b: &'a CanonicalSpec,
    workspaces: Option<(&'a WorkspaceListing, &'a WorkspaceListing)>,
    ignore: Option<&'a IgnoreRuleSet>,
}

impl<'a> WorkflowDiff<'a> {
    /// Create a diff of the specifications alone
    pub fn new(a: &'a CanonicalSpec, b: &'a CanonicalSpec) -> Self {
        Self {
            a,
            b,
            workspaces: None,
            ignore: None,
        }
    }

    /// Also compare two workspace listings by path, size and modification time
    pub fn with_workspaces(mut self, a: &'a WorkspaceListing, b: &'a WorkspaceListing) -> Self {
        self.workspaces = Some((a, b));
        self
    }

    /// Applied to both listings before they are compared
    pub fn with_ignore(mut self, rules: &'a IgnoreRuleSet) -> Self {
        self.ignore = Some(rules);
        self
    }

    /// Compute every difference
    ///
    /// Serial steps are matched by name. Steps of every other engine are
    /// matched by position, so a renamed step shows up as a changed name.
    pub fn compute(&self) -> Vec<DiffEntry> {
        let mut entries = Vec::new();

        if self.a.engine != self.b.engine {
            entries.push(DiffEntry::changed(
                DiffOrigin::Specification,
                "engine",
                self.a.engine.as_str(),
                self.b.engine.as_str(),
            ));
        }

        if self.a.engine == Engine::Serial && self.b.engine == Engine::Serial {
            diff_steps_by_name(&self.a.steps, &self.b.steps, &mut entries);
        } else {
            diff_steps_by_index(&self.a.steps, &self.b.steps, &mut entries);
        }

        diff_manifest("inputs", &self.a.inputs, &self.b.inputs, &mut entries);
        diff_manifest("outputs", &self.a.outputs, &self.b.outputs, &mut entries);
        diff_parameters(&self.a.parameters, &self.b.parameters, &mut entries);

        if let Some((a, b)) = self.workspaces {
            match self.ignore {
                Some(rules) => diff_workspaces(
                    &a.without_ignored(rules),
                    &b.without_ignored(rules),
                    &mut entries,
                ),
                None => diff_workspaces(a, b, &mut entries),
            }
        }

        debug!("Computed {} diff entries", entries.len());
        entries
    }
}

/// Shorthand for a specification-only [`WorkflowDiff`]
pub fn diff_specs(a: &CanonicalSpec, b: &CanonicalSpec) -> Vec<DiffEntry> {
    WorkflowDiff::new(a, b).compute()
}

fn diff_steps_by_name(a: &[Step], b: &[Step], entries: &mut Vec<DiffEntry>) {
    for step in a {
        match b.iter().find(|other| other.name == step.name) {
            Some(other) => {
                if let Some((before, after)) = changed_fields(step, other, false) {
                    entries.push(DiffEntry::changed(
                        DiffOrigin::Specification,
                        &step.name,
                        before,
                        after,
                    ));
                }
            }
            None => entries.push(DiffEntry::removed(
                DiffOrigin::Specification,
                &step.name,
                Some(render_step(step)),
            )),
        }
    }

    for step in b.iter().filter(|step| !a.iter().any(|other| other.name == step.name)) {
        entries.push(DiffEntry::added(
            DiffOrigin::Specification,
            &step.name,
            Some(render_step(step)),
        ));
    }
}

fn diff_steps_by_index(a: &[Step], b: &[Step], entries: &mut Vec<DiffEntry>) {
    for index in 0..a.len().max(b.len()) {
        let path = format!("steps[{}]", index);
        match (a.get(index), b.get(index)) {
            (Some(before), Some(after)) => {
                if let Some((before, after)) = changed_fields(before, after, true) {
                    entries.push(DiffEntry::changed(
                        DiffOrigin::Specification,
                        path,
                        before,
                        after,
                    ));
                }
            }
            (Some(step), None) => entries.push(DiffEntry::removed(
                DiffOrigin::Specification,
                path,
                Some(render_step(step)),
            )),
            (None, Some(step)) => entries.push(DiffEntry::added(
                DiffOrigin::Specification,
                path,
                Some(render_step(step)),
            )),
            (None, None) => {}
        }
    }
}

/// Render only the fields that differ; `None` when the steps are equivalent
fn changed_fields(a: &Step, b: &Step, compare_names: bool) -> Option<(String, String)> {
    let mut before = Vec::new();
    let mut after = Vec::new();

    if compare_names && a.name != b.name {
        before.push(format!("name: {}", a.name));
        after.push(format!("name: {}", b.name));
    }
    if a.command_template != b.command_template {
        before.push(format!("commands: {:?}", a.command_template));
        after.push(format!("commands: {:?}", b.command_template));
    }
    if a.environment != b.environment {
        before.push(format!("environment: {}", render_environment(a)));
        after.push(format!("environment: {}", render_environment(b)));
    }
    if a.resources != b.resources {
        before.push(format!("resources: {}", render_resources(&a.resources)));
        after.push(format!("resources: {}", render_resources(&b.resources)));
    }

    if before.is_empty() {
        None
    } else {
        Some((before.join("; "), after.join("; ")))
    }
}

fn render_step(step: &Step) -> String {
    let mut rendered = format!(
        "name: {}; commands: {:?}; environment: {}",
        step.name,
        step.command_template,
        render_environment(step)
    );
    if !step.resources.is_empty() {
        rendered.push_str(&format!("; resources: {}", render_resources(&step.resources)));
    }
    rendered
}

fn render_resources(resources: &Resources) -> String {
    let mut fields = Vec::new();
    if let Some(backend) = &resources.compute_backend {
        fields.push(format!("compute_backend={}", backend));
    }
    if let Some(limit) = &resources.kubernetes_memory_limit {
        fields.push(format!("kubernetes_memory_limit={}", limit));
    }
    if let Some(uid) = resources.kubernetes_uid {
        fields.push(format!("kubernetes_uid={}", uid));
    }
    if fields.is_empty() {
        "<none>".to_string()
    } else {
        fields.join(", ")
    }
}

fn render_environment(step: &Step) -> &str {
    step.environment.as_deref().unwrap_or("<none>")
}

fn diff_manifest(section: &str, a: &Manifest, b: &Manifest, entries: &mut Vec<DiffEntry>) {
    for (kind, before, after) in [
        ("files", &a.files, &b.files),
        ("directories", &a.directories, &b.directories),
    ] {
        diff_path_set(&format!("{}.{}", section, kind), before, after, entries);
    }
}

fn diff_path_set(
    prefix: &str,
    a: &BTreeSet<String>,
    b: &BTreeSet<String>,
    entries: &mut Vec<DiffEntry>,
) {
    for path in a.union(b) {
        let entry_path = format!("{}:{}", prefix, path);
        match (a.contains(path), b.contains(path)) {
            (true, false) => entries.push(DiffEntry::removed(
                DiffOrigin::Specification,
                entry_path,
                None,
            )),
            (false, true) => {
                entries.push(DiffEntry::added(DiffOrigin::Specification, entry_path, None))
            }
            _ => {}
        }
    }
}

fn diff_parameters(
    a: &BTreeMap<String, Value>,
    b: &BTreeMap<String, Value>,
    entries: &mut Vec<DiffEntry>,
) {
    let names: BTreeSet<&String> = a.keys().chain(b.keys()).collect();

    for name in names {
        match (a.get(name), b.get(name)) {
            (Some(before), Some(after)) if before != after => entries.push(DiffEntry::changed(
                DiffOrigin::Parameters,
                name,
                render_value(before),
                render_value(after),
            )),
            (Some(before), None) => entries.push(DiffEntry::removed(
                DiffOrigin::Parameters,
                name,
                Some(render_value(before)),
            )),
            (None, Some(after)) => entries.push(DiffEntry::added(
                DiffOrigin::Parameters,
                name,
                Some(render_value(after)),
            )),
            _ => {}
        }
    }
}

fn diff_workspaces(a: &WorkspaceListing, b: &WorkspaceListing, entries: &mut Vec<DiffEntry>) {
    let paths: BTreeSet<&str> = a.paths().chain(b.paths()).collect();

    for path in paths {
        match (a.get(path), b.get(path)) {
            (Some(before), Some(after)) if before != after => entries.push(DiffEntry::changed(
                DiffOrigin::Workspace,
                path,
                before.to_string(),
                after.to_string(),
            )),
            (Some(before), None) => entries.push(DiffEntry::removed(
                DiffOrigin::Workspace,
                path,
                Some(before.to_string()),
            )),
            (None, Some(after)) => entries.push(DiffEntry::added(
                DiffOrigin::Workspace,
                path,
                Some(after.to_string()),
            )),
            _ => {}
        }
    }
}

/// Scalars render as plain text, everything else as JSON
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffKind;

    fn serial(steps: &[(&str, &str)]) -> CanonicalSpec {
        let mut spec = CanonicalSpec::new(Engine::Serial);
        for (name, command) in steps {
            spec.steps.push(
                Step::new(*name)
                    .with_commands([*command])
                    .with_environment("python:3.12"),
            );
        }
        spec
    }

    #[test]
    fn test_changed_step_renders_only_differing_fields() {
        let a = serial(&[("fit", "python fit.py")]);
        let b = serial(&[("fit", "python fit.py --fast")]);

        let entries = diff_specs(&a, &b);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, DiffKind::Changed);
        assert_eq!(entries[0].before.as_deref(), Some("commands: [\"python fit.py\"]"));
        assert_eq!(
            entries[0].after.as_deref(),
            Some("commands: [\"python fit.py --fast\"]")
        );
    }

    #[test]
    fn test_index_comparison_includes_names() {
        let mut a = CanonicalSpec::new(Engine::Yadage);
        a.steps.push(Step::new("gen").with_commands(["gen"]));
        let mut b = CanonicalSpec::new(Engine::Yadage);
        b.steps.push(Step::new("generate").with_commands(["gen"]));

        let entries = diff_specs(&a, &b);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "steps[0]");
        assert_eq!(entries[0].before.as_deref(), Some("name: gen"));
    }

    #[test]
    fn test_changed_resources_are_reported() {
        let a = serial(&[("fit", "python fit.py")]);
        let mut b = serial(&[("fit", "python fit.py")]);
        b.steps[0].resources = Resources {
            compute_backend: Some("slurmcern".to_string()),
            kubernetes_uid: Some(1000),
            ..Default::default()
        };

        let entries = diff_specs(&a, &b);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "fit");
        assert_eq!(entries[0].before.as_deref(), Some("resources: <none>"));
        assert_eq!(
            entries[0].after.as_deref(),
            Some("resources: compute_backend=slurmcern, kubernetes_uid=1000")
        );
        assert_eq!(diff_specs(&b, &a)[0], entries[0].inverted());
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&Value::from(0.5)), "0.5");
        assert_eq!(render_value(&Value::from("data.root")), "data.root");
        let list: Value = serde_yaml::from_str("[1, 2]").unwrap();
        assert_eq!(render_value(&list), "[1,2]");
    }
}
