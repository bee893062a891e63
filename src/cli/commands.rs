// ABOUTME: Command implementations for the wfcheck CLI
// ABOUTME: Handles execution of the validate and diff commands

use anyhow::{anyhow, Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::args::Args;
use super::config::Config;
use super::loader;
use crate::diff::{WorkflowDiff, WorkspaceListing};
use crate::output::{self, FindingSection, OutputFormat};
use crate::parser::{CanonicalSpec, Engine, Normalized, SpecNormalizer};
use crate::registry::HttpRegistryLookup;
use crate::validation::{
    has_errors, EnvironmentValidator, Finding, ParameterAnalyzer, ResourceValidator, Severity,
};

pub struct ValidateOptions {
    pub parameters: Vec<String>,
    pub engine: Option<Engine>,
    pub environments: bool,
    pub max_lookups: Option<usize>,
    pub format: OutputFormat,
}

pub struct DiffOptions {
    pub workspace_a: Option<PathBuf>,
    pub workspace_b: Option<PathBuf>,
    pub ignore_file: Option<PathBuf>,
    pub format: OutputFormat,
}

/// Validate a specification file
pub async fn validate_specification(
    spec_path: PathBuf,
    options: ValidateOptions,
    config: &Config,
) -> Result<()> {
    info!("Validating specification: {}", spec_path.display());

    let overrides = Args::parse_parameters(&options.parameters)?;
    let mut normalizer = SpecNormalizer::new().with_overrides(overrides);
    if let Some(engine) = options.engine {
        normalizer = normalizer.with_engine(engine);
    }

    let Normalized { spec, warnings } = normalize_file(&spec_path, &normalizer)?;

    let mut specification = vec![Finding::new(
        Severity::Success,
        format!("Valid {} specification file.", spec.engine),
    )];
    specification.extend(
        warnings
            .iter()
            .map(|warning| Finding::new(Severity::Warning, warning.to_string())),
    );

    let mut sections = vec![
        FindingSection::new("Verifying specification file...", specification),
        FindingSection::new(
            "Verifying workflow parameters and commands...",
            ParameterAnalyzer::new().analyze(&spec).findings(),
        ),
        FindingSection::new(
            "Verifying compute backends...",
            ResourceValidator::new()
                .with_supported_backends(config.compute_backends.iter().cloned())
                .validate(&spec)
                .findings(),
        ),
    ];

    if options.environments {
        let max_lookups = options.max_lookups.unwrap_or(config.max_concurrent_lookups);
        sections.push(FindingSection::new(
            "Verifying environments...",
            check_environments(&spec, max_lookups, config).await?,
        ));
    }

    let rendered = options.format.formatter().format_validation(&sections)?;
    output::emit(&mut io::stdout().lock(), &rendered)?;

    let failed = sections
        .iter()
        .any(|section| has_errors(&section.findings));
    if failed {
        return Err(anyhow!(
            "Specification {} failed validation",
            spec_path.display()
        ));
    }

    info!("Specification validation completed");
    Ok(())
}

async fn check_environments(
    spec: &CanonicalSpec,
    max_lookups: usize,
    config: &Config,
) -> Result<Vec<Finding>> {
    let lookup = HttpRegistryLookup::new(config.request_timeout)
        .context("Failed to create registry client")?;
    let validator = EnvironmentValidator::new()
        .with_max_concurrent(max_lookups)
        .with_deadline(config.lookup_timeout);

    match validator.validate(spec, &lookup).await {
        Ok(report) => Ok(report.findings()),
        Err(partial) => {
            warn!("{}", partial);
            let mut findings = partial.report.findings();
            findings.push(Finding::new(Severity::Error, partial.to_string()));
            Ok(findings)
        }
    }
}

/// Compare two specifications and optionally their workspaces
pub async fn diff_specifications(
    spec_a: PathBuf,
    spec_b: PathBuf,
    options: DiffOptions,
    config: &Config,
) -> Result<()> {
    info!(
        "Comparing {} with {}",
        spec_a.display(),
        spec_b.display()
    );

    let normalizer = SpecNormalizer::new();
    let a = normalize_file(&spec_a, &normalizer)?.spec;
    let b = normalize_file(&spec_b, &normalizer)?.spec;

    let listings = match (&options.workspace_a, &options.workspace_b) {
        (Some(dir_a), Some(dir_b)) => Some((scan(dir_a)?, scan(dir_b)?)),
        _ => None,
    };

    let ignore_path = options
        .ignore_file
        .clone()
        .unwrap_or_else(|| config.ignore_file.clone());
    let rules = loader::load_ignore_rules(&ignore_path)?;

    let mut diff = WorkflowDiff::new(&a, &b);
    if let Some((listing_a, listing_b)) = &listings {
        diff = diff.with_workspaces(listing_a, listing_b);
        if !rules.is_empty() {
            diff = diff.with_ignore(&rules);
        }
    }
    let entries = diff.compute();

    let rendered = options.format.formatter().format_diff(&entries)?;
    output::emit(&mut io::stdout().lock(), &rendered)?;

    info!("Found {} differences", entries.len());
    Ok(())
}

fn normalize_file(path: &Path, normalizer: &SpecNormalizer) -> Result<Normalized> {
    let document = loader::load_specification(path)?;
    normalizer
        .normalize(&document)
        .with_context(|| format!("Invalid specification {}", path.display()))
}

fn scan(dir: &Path) -> Result<WorkspaceListing> {
    WorkspaceListing::scan(dir)
        .with_context(|| format!("Failed to list workspace {}", dir.display()))
}
