// ABOUTME: Environment image validator checking step images against a registry
// ABOUTME: Deduplicates fully-qualified references and bounds concurrent lookups

use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::error::{ImageReferenceError, PartialResultError};
use super::image::{explicit_tag, ImageReference};
use super::report::{Finding, Severity};
use crate::parser::CanonicalSpec;
use crate::registry::{RegistryLookup, RegistryLookupError};

pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 4;
pub const SUSPECTED_TAGS: [&str; 2] = ["latest", "master"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    Available,
    Failed(RegistryLookupError),
    Unchecked,
}

/// Result for one unique fully-qualified reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCheck {
    pub reference: ImageReference,
    pub status: ImageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Index into `EnvironmentReport::checks`
    Checked(usize),
    Rejected(ImageReferenceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageWarning {
    MissingTag,
    SuspectedTag { tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepImage {
    pub step: String,
    pub image: String,
    pub resolution: Resolution,
    pub warning: Option<ImageWarning>,
}

impl fmt::Display for ImageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageWarning::MissingTag => write!(f, "does not have an explicit tag"),
            ImageWarning::SuspectedTag { tag } => write!(f, "uses the '{}' tag, which is not recommended", tag),
        }
    }
}

/// Outcome of one environment validation
///
/// Steps point into `checks`, so two steps using the same image share one
/// lookup result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentReport {
    pub checks: Vec<ImageCheck>,
    /// One entry per step with an environment, in step order
    pub steps: Vec<StepImage>,
}

impl EnvironmentReport {
    /// Lookup status of a step's image; `None` when the reference was rejected locally
    pub fn status_of(&self, step: &StepImage) -> Option<&ImageStatus> {
        match step.resolution {
            Resolution::Checked(index) => self.checks.get(index).map(|check| &check.status),
            Resolution::Rejected(_) => None,
        }
    }

    pub fn findings(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        for step in &self.steps {
            if let Some(warning) = &step.warning {
                findings.push(
                    Finding::new(
                        Severity::Warning,
                        format!("Environment image {} {}.", step.image, warning),
                    )
                    .for_step(&step.step),
                );
            }

            let finding = match &step.resolution {
                Resolution::Rejected(error) => Finding::new(Severity::Error, error.to_string()),
                Resolution::Checked(index) => match self.checks.get(*index) {
                    Some(check) => check_finding(check),
                    None => continue,
                },
            };
            findings.push(finding.for_step(&step.step));
        }

        findings
    }

    pub fn has_errors(&self) -> bool {
        self.steps.iter().any(|step| match &step.resolution {
            Resolution::Rejected(_) => true,
            Resolution::Checked(_) => matches!(self.status_of(step), Some(ImageStatus::Failed(_))),
        })
    }
}

fn check_finding(check: &ImageCheck) -> Finding {
    match &check.status {
        ImageStatus::Available => Finding::new(
            Severity::Success,
            format!(
                "Environment image {} exists in {}.",
                check.reference, check.reference.registry
            ),
        ),
        ImageStatus::Failed(error) => Finding::new(Severity::Error, error.to_string()),
        ImageStatus::Unchecked => Finding::new(
            Severity::Warning,
            format!("Environment image {} was not checked.", check.reference),
        ),
    }
}

/// Checks that every step's container image exists in its registry
///
/// Each unique fully-qualified reference is looked up once per call. At most
/// `max_concurrent` lookups run at the same time, and one failing lookup
/// never affects the others.
#[derive(Debug, Clone)]
pub struct EnvironmentValidator {
    max_concurrent: usize,
    deadline: Option<Duration>,
}

impl Default for EnvironmentValidator {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT_LOOKUPS,
            deadline: None,
        }
    }
}

impl EnvironmentValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit on lookups in flight; zero is raised to one
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Overall deadline applied by [`EnvironmentValidator::validate`]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Validates with the configured deadline, or without one
    pub async fn validate(
        &self,
        spec: &CanonicalSpec,
        lookup: &dyn RegistryLookup,
    ) -> Result<EnvironmentReport, PartialResultError> {
        match self.deadline {
            Some(deadline) => {
                self.validate_until(spec, lookup, tokio::time::sleep(deadline))
                    .await
            }
            None => {
                self.validate_until(spec, lookup, futures::future::pending::<()>())
                    .await
            }
        }
    }

    /// Validates until every lookup finished or `cancel` resolves, whichever comes first
    #[instrument(skip_all, fields(engine = %spec.engine, steps = spec.steps.len()))]
    pub async fn validate_until<F>(
        &self,
        spec: &CanonicalSpec,
        lookup: &dyn RegistryLookup,
        cancel: F,
    ) -> Result<EnvironmentReport, PartialResultError>
    where
        F: Future<Output = ()>,
    {
        let (steps, unique) = plan(spec);
        info!(
            "Checking {} unique environment image(s) used by {} step(s)",
            unique.len(),
            steps.len()
        );

        let mut slots: Vec<Option<ImageStatus>> = vec![None; unique.len()];
        let semaphore = Semaphore::new(self.max_concurrent);

        let mut pending: FuturesUnordered<_> = unique
            .iter()
            .enumerate()
            .map(|(index, reference)| {
                let semaphore = &semaphore;
                async move {
                    let _permit = semaphore.acquire().await;
                    debug!("Looking up {}", reference);
                    (index, lookup.lookup(reference).await)
                }
            })
            .collect();

        tokio::pin!(cancel);
        let mut cancelled = false;
        while !pending.is_empty() {
            tokio::select! {
                biased;
                Some((index, outcome)) = pending.next() => {
                    slots[index] = Some(status_from(outcome, &unique[index]));
                }
                _ = &mut cancel => {
                    cancelled = true;
                    break;
                }
            }
        }
        drop(pending);

        let mut unchecked = Vec::new();
        let checks: Vec<ImageCheck> = unique
            .into_iter()
            .zip(slots)
            .map(|(reference, slot)| {
                let status = slot.unwrap_or_else(|| {
                    unchecked.push(reference.clone());
                    ImageStatus::Unchecked
                });
                ImageCheck { reference, status }
            })
            .collect();

        let report = EnvironmentReport { checks, steps };

        if cancelled && !unchecked.is_empty() {
            warn!(
                "Environment validation cancelled with {} image(s) unchecked",
                unchecked.len()
            );
            return Err(PartialResultError { report, unchecked });
        }

        info!("Environment validation completed");
        Ok(report)
    }
}

/// Resolve every step image and collect unique references in first-use order
fn plan(spec: &CanonicalSpec) -> (Vec<StepImage>, Vec<ImageReference>) {
    let mut unique: IndexSet<ImageReference> = IndexSet::new();
    let mut steps = Vec::new();

    for step in &spec.steps {
        let Some(raw) = step.environment.as_deref() else {
            continue;
        };

        let (resolution, warning) = match ImageReference::parse(raw) {
            Ok(reference) => {
                let (index, _) = unique.insert_full(reference);
                (Resolution::Checked(index), tag_warning(raw))
            }
            Err(error) => {
                debug!("Rejected environment image of step {}: {}", step.name, error);
                (Resolution::Rejected(error), None)
            }
        };

        steps.push(StepImage {
            step: step.name.clone(),
            image: raw.to_string(),
            resolution,
            warning,
        });
    }

    (steps, unique.into_iter().collect())
}

fn tag_warning(raw: &str) -> Option<ImageWarning> {
    match explicit_tag(raw) {
        None => Some(ImageWarning::MissingTag),
        Some(tag) if SUSPECTED_TAGS.contains(&tag) => Some(ImageWarning::SuspectedTag {
            tag: tag.to_string(),
        }),
        Some(_) => None,
    }
}

fn status_from(
    outcome: crate::registry::Result<bool>,
    reference: &ImageReference,
) -> ImageStatus {
    match outcome {
        Ok(true) => ImageStatus::Available,
        Ok(false) => ImageStatus::Failed(RegistryLookupError::NotFound {
            image: reference.to_string(),
            registry: reference.registry.clone(),
        }),
        Err(error) => {
            warn!("Lookup of {} failed: {}", reference, error);
            ImageStatus::Failed(error)
        }
    }
}
