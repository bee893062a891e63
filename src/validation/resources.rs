// ABOUTME: Validation of per-step resource requests against the supported compute backends
// ABOUTME: Unsupported backends are errors, malformed memory limits warnings, UIDs informational

use serde::Serialize;
use tracing::debug;

use super::report::{Finding, Severity};
use crate::parser::{CanonicalSpec, Step};

pub const DEFAULT_COMPUTE_BACKENDS: [&str; 3] = ["kubernetes", "htcondorcern", "slurmcern"];

const MEMORY_SUFFIXES: [&str; 13] = [
    "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "k", "M", "G", "T", "P", "E", "m",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceIssue {
    UnsupportedBackend { step: String, backend: String },
    InvalidMemoryLimit { step: String, limit: String },
    NegativeUid { step: String, uid: i64 },
    CustomUid { step: String, uid: i64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    pub supported_backends: Vec<String>,
    pub issues: Vec<ResourceIssue>,
}

impl ResourceReport {
    pub fn findings(&self) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self
            .issues
            .iter()
            .map(|issue| self.finding(issue))
            .collect();

        let backends_valid = !self
            .issues
            .iter()
            .any(|issue| matches!(issue, ResourceIssue::UnsupportedBackend { .. }));
        if backends_valid {
            findings.push(Finding::new(
                Severity::Success,
                "Workflow compute backends appear to be valid.",
            ));
        }

        findings
    }

    fn finding(&self, issue: &ResourceIssue) -> Finding {
        match issue {
            ResourceIssue::UnsupportedBackend { step, backend } => Finding::new(
                Severity::Error,
                format!(
                    "Compute backend \"{}\" found in step \"{}\" is not supported. \
                     List of supported compute backends: \"{}\"",
                    backend,
                    step,
                    self.supported_backends.join(", ")
                ),
            )
            .for_step(step),
            ResourceIssue::InvalidMemoryLimit { step, limit } => Finding::new(
                Severity::Warning,
                format!(
                    "Kubernetes memory limit \"{}\" found in step \"{}\" is not a valid quantity.",
                    limit, step
                ),
            )
            .for_step(step),
            ResourceIssue::NegativeUid { step, uid } => Finding::new(
                Severity::Warning,
                format!(
                    "`kubernetes_uid` set to {} in step \"{}\" is negative.",
                    uid, step
                ),
            )
            .for_step(step),
            ResourceIssue::CustomUid { step, uid } => Finding::new(
                Severity::Info,
                format!(
                    "`kubernetes_uid` set to {} in step \"{}\". Make sure the image allows running as this UID.",
                    uid, step
                ),
            )
            .for_step(step),
        }
    }
}

/// Checks the resource requests of every step
///
/// The supported backend list is injected; the default is the set a stock
/// REANA cluster offers.
#[derive(Debug, Clone)]
pub struct ResourceValidator {
    supported_backends: Vec<String>,
}

impl Default for ResourceValidator {
    fn default() -> Self {
        Self::new().with_supported_backends(DEFAULT_COMPUTE_BACKENDS)
    }
}

impl ResourceValidator {
    /// A validator accepting no compute backend at all
    pub fn new() -> Self {
        Self {
            supported_backends: Vec::new(),
        }
    }

    pub fn with_supported_backends<I, S>(mut self, backends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_backends = backends.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self, spec: &CanonicalSpec) -> ResourceReport {
        let issues: Vec<ResourceIssue> = spec
            .steps
            .iter()
            .flat_map(|step| self.check_step(step))
            .collect();

        debug!(
            "Checked resources of {} steps: {} issues",
            spec.steps.len(),
            issues.len()
        );

        ResourceReport {
            supported_backends: self.supported_backends.clone(),
            issues,
        }
    }

    fn check_step(&self, step: &Step) -> Vec<ResourceIssue> {
        let mut issues = Vec::new();
        let resources = &step.resources;

        if let Some(backend) = &resources.compute_backend {
            let supported = self
                .supported_backends
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(backend));
            if !supported {
                issues.push(ResourceIssue::UnsupportedBackend {
                    step: step.name.clone(),
                    backend: backend.clone(),
                });
            }
        }

        if let Some(limit) = &resources.kubernetes_memory_limit {
            if !is_memory_quantity(limit) {
                issues.push(ResourceIssue::InvalidMemoryLimit {
                    step: step.name.clone(),
                    limit: limit.clone(),
                });
            }
        }

        match resources.kubernetes_uid {
            Some(uid) if uid < 0 => issues.push(ResourceIssue::NegativeUid {
                step: step.name.clone(),
                uid,
            }),
            Some(uid) => issues.push(ResourceIssue::CustomUid {
                step: step.name.clone(),
                uid,
            }),
            None => {}
        }

        issues
    }
}

/// Kubernetes quantity: a decimal number with an optional binary or decimal suffix
fn is_memory_quantity(limit: &str) -> bool {
    let number = MEMORY_SUFFIXES
        .iter()
        .find_map(|suffix| limit.strip_suffix(suffix))
        .unwrap_or(limit);

    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (number, None),
    };
    let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());

    digits(whole) && fraction.map_or(true, digits)
}
