// ABOUTME: Integration tests for parameter analysis and environment image validation
// ABOUTME: Uses a counting in-memory registry to observe lookups and concurrency

use std::time::Duration;

use wfcheck::parser::{CanonicalSpec, Engine, Step};
use wfcheck::registry::RegistryLookupError;
use wfcheck::validation::{
    EnvironmentValidator, ImageStatus, ParameterAnalyzer, Resolution, ResourceIssue,
    ResourceValidator, Severity,
};

mod common;

use common::{CountingLookup, SerialSpecBuilder};

fn spec_with_images(images: &[&str]) -> CanonicalSpec {
    let mut spec = CanonicalSpec::new(Engine::Serial);
    for (index, image) in images.iter().enumerate() {
        spec.steps.push(
            Step::new(format!("step{}", index))
                .with_commands(["true"])
                .with_environment(*image),
        );
    }
    spec
}

#[test]
fn test_unused_parameter_is_reported_for_whole_specification() {
    let spec = SerialSpecBuilder::new()
        .with_parameter("events", "100")
        .with_parameter("threshold", "0.5")
        .with_step("gendata", "python:3.12", &["python gen.py ${events}"])
        .with_step("fit", "python:3.12", &["python fit.py --events ${events}"])
        .build();

    let report = ParameterAnalyzer::new().analyze(&spec);

    assert_eq!(report.unused.len(), 1);
    assert!(report.unused.contains("threshold"));
    assert!(report.steps.iter().all(|step| step.unresolved.is_empty()));
}

#[test]
fn test_undeclared_placeholder_is_unresolved_per_step() {
    let spec = SerialSpecBuilder::new()
        .with_parameter("events", "100")
        .with_step("gendata", "python:3.12", &["python gen.py ${events}"])
        .with_step("sample", "python:3.12", &["python sample.py ${sample_size}"])
        .build();

    let report = ParameterAnalyzer::new().analyze(&spec);

    assert!(report.steps[0].unresolved.is_empty());
    assert_eq!(report.steps[1].step, "sample");
    assert!(report.steps[1].unresolved.contains("sample_size"));

    let findings = report.findings();
    assert!(findings
        .iter()
        .any(|finding| finding.step.as_deref() == Some("sample")
            && finding.message.contains("sample_size")));
    assert!(findings.iter().all(|finding| finding.severity != Severity::Error));
}

#[test]
fn test_malformed_placeholder_is_a_finding() {
    let spec = SerialSpecBuilder::new()
        .with_step("broken", "python:3.12", &["echo ${unterminated"])
        .build();

    let report = ParameterAnalyzer::new().analyze(&spec);
    assert_eq!(report.steps[0].malformed, vec!["${unterminated".to_string()]);
}

#[test]
fn test_clean_specification_reports_success() {
    let spec = SerialSpecBuilder::new()
        .with_parameter("events", "100")
        .with_step("gendata", "python:3.12", &["python gen.py ${events}"])
        .build();

    let findings = ParameterAnalyzer::new().analyze(&spec).findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Success);
}

#[tokio::test]
async fn test_implicit_latest_is_looked_up_once() {
    let lookup = CountingLookup::new();
    let spec = spec_with_images(&["myrepo/img", "myrepo/img:latest"]);

    let report = EnvironmentValidator::new()
        .validate(&spec, &lookup)
        .await
        .unwrap();

    assert_eq!(lookup.calls(), 1);
    assert_eq!(lookup.seen(), vec!["docker.io/myrepo/img:latest".to_string()]);
    assert_eq!(report.checks.len(), 1);

    let first = report.status_of(&report.steps[0]).unwrap();
    let second = report.status_of(&report.steps[1]).unwrap();
    assert_eq!(first, second);
    assert!(matches!(
        first,
        ImageStatus::Failed(RegistryLookupError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_whitespace_is_rejected_without_lookup() {
    let lookup = CountingLookup::new();
    let spec = spec_with_images(&["reanahub/reana-env-root6 :6.18.04"]);

    let report = EnvironmentValidator::new()
        .validate(&spec, &lookup)
        .await
        .unwrap();

    assert_eq!(lookup.calls(), 0);
    assert!(matches!(report.steps[0].resolution, Resolution::Rejected(_)));
    assert!(report.has_errors());
}

#[tokio::test]
async fn test_failed_lookup_does_not_affect_others() {
    let lookup = CountingLookup::new()
        .with_existing("docker.io/library/python:3.12")
        .with_unavailable("ghcr.io/org/tool:1.0");
    let spec = spec_with_images(&["ghcr.io/org/tool:1.0", "python:3.12"]);

    let report = EnvironmentValidator::new()
        .validate(&spec, &lookup)
        .await
        .unwrap();

    assert_eq!(lookup.calls(), 2);
    assert!(matches!(
        report.status_of(&report.steps[0]),
        Some(ImageStatus::Failed(error)) if error.is_transient()
    ));
    assert_eq!(
        report.status_of(&report.steps[1]),
        Some(&ImageStatus::Available)
    );
}

#[tokio::test]
async fn test_lookups_are_bounded_and_results_keep_step_order() {
    let images: Vec<String> = (0..8).map(|i| format!("org/image{}:1.0", i)).collect();
    let refs: Vec<&str> = images.iter().map(String::as_str).collect();
    let mut lookup = CountingLookup::new().with_delay(Duration::from_millis(20));
    for i in 0..8 {
        lookup = lookup.with_existing(&format!("docker.io/org/image{}:1.0", i));
    }

    let report = EnvironmentValidator::new()
        .with_max_concurrent(2)
        .validate(&spec_with_images(&refs), &lookup)
        .await
        .unwrap();

    assert_eq!(lookup.calls(), 8);
    assert_eq!(lookup.max_in_flight(), 2);
    for (index, step) in report.steps.iter().enumerate() {
        assert_eq!(step.step, format!("step{}", index));
        assert_eq!(step.resolution, Resolution::Checked(index));
        assert_eq!(report.status_of(step), Some(&ImageStatus::Available));
    }
}

#[tokio::test]
async fn test_out_of_order_completion_keeps_step_order() {
    let lookup = CountingLookup::new()
        .with_existing("docker.io/org/slow:1.0")
        .with_existing("docker.io/org/fast:1.0")
        .with_existing("docker.io/org/medium:1.0")
        .with_delay_for("docker.io/org/slow:1.0", Duration::from_millis(150))
        .with_delay_for("docker.io/org/fast:1.0", Duration::from_millis(5))
        .with_delay_for("docker.io/org/medium:1.0", Duration::from_millis(60));
    let spec = spec_with_images(&["org/slow:1.0", "org/fast:1.0", "org/medium:1.0"]);

    let report = EnvironmentValidator::new()
        .with_max_concurrent(3)
        .validate(&spec, &lookup)
        .await
        .unwrap();

    assert_eq!(
        lookup.completed(),
        vec![
            "docker.io/org/fast:1.0",
            "docker.io/org/medium:1.0",
            "docker.io/org/slow:1.0"
        ]
    );
    assert_eq!(lookup.max_in_flight(), 3);

    let checked: Vec<String> = report
        .checks
        .iter()
        .map(|check| check.reference.to_string())
        .collect();
    assert_eq!(
        checked,
        vec![
            "docker.io/org/slow:1.0",
            "docker.io/org/fast:1.0",
            "docker.io/org/medium:1.0"
        ]
    );

    let steps: Vec<Option<String>> = report
        .findings()
        .into_iter()
        .map(|finding| finding.step)
        .collect();
    assert_eq!(
        steps,
        vec![
            Some("step0".to_string()),
            Some("step1".to_string()),
            Some("step2".to_string())
        ]
    );
}

#[test]
fn test_unsupported_compute_backend_is_an_error() {
    let spec = SerialSpecBuilder::new()
        .with_step("gendata", "python:3.12", &["python gen.py"])
        .with_resource("compute_backend", "htcondorcern")
        .with_step("fit", "python:3.12", &["python fit.py"])
        .with_resource("compute_backend", "lsf")
        .with_resource("kubernetes_memory_limit", "2GB")
        .build();

    let report = ResourceValidator::new()
        .with_supported_backends(["kubernetes", "htcondorcern"])
        .validate(&spec);

    assert_eq!(
        report.issues,
        vec![
            ResourceIssue::UnsupportedBackend {
                step: "fit".to_string(),
                backend: "lsf".to_string(),
            },
            ResourceIssue::InvalidMemoryLimit {
                step: "fit".to_string(),
                limit: "2GB".to_string(),
            },
        ]
    );

    let findings = report.findings();
    assert_eq!(findings[0].severity, Severity::Error);
    assert!(findings[0]
        .message
        .contains("List of supported compute backends: \"kubernetes, htcondorcern\""));
    assert_eq!(findings[1].severity, Severity::Warning);
    assert!(findings.iter().all(|f| f.severity != Severity::Success));
}

#[test]
fn test_kubernetes_uid_is_informational() {
    let spec = SerialSpecBuilder::new()
        .with_step("gendata", "python:3.12", &["python gen.py"])
        .with_resource("kubernetes_uid", "2000")
        .with_resource("kubernetes_memory_limit", "'256Mi'")
        .build();

    let findings = ResourceValidator::default().validate(&spec).findings();

    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].severity, Severity::Info);
    assert_eq!(findings[0].step.as_deref(), Some("gendata"));
    assert!(findings[0].message.contains("`kubernetes_uid` set to 2000"));
    assert_eq!(findings[1].severity, Severity::Success);
    assert_eq!(findings[1].message, "Workflow compute backends appear to be valid.");
}

#[tokio::test]
async fn test_cancellation_keeps_completed_results() {
    let lookup = CountingLookup::new()
        .with_delay(Duration::from_millis(200))
        .with_existing("docker.io/library/python:3.12");
    let spec = spec_with_images(&["python:3.12", "ubuntu:22.04"]);

    let error = EnvironmentValidator::new()
        .with_max_concurrent(1)
        .validate_until(&spec, &lookup, tokio::time::sleep(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert_eq!(error.report.checks[0].status, ImageStatus::Available);
    assert_eq!(error.report.checks[1].status, ImageStatus::Unchecked);
    assert_eq!(error.unchecked.len(), 1);
    assert_eq!(error.unchecked[0].to_string(), "docker.io/library/ubuntu:22.04");
}

#[tokio::test]
async fn test_deadline_applies_to_validate() {
    let lookup = CountingLookup::new().with_delay(Duration::from_secs(5));
    let spec = spec_with_images(&["python:3.12"]);

    let error = EnvironmentValidator::new()
        .with_deadline(Duration::from_millis(50))
        .validate(&spec, &lookup)
        .await
        .unwrap_err();

    assert_eq!(error.unchecked.len(), 1);
}

#[tokio::test]
async fn test_tag_warnings_are_findings() {
    let lookup = CountingLookup::new()
        .with_existing("docker.io/library/python:latest")
        .with_existing("docker.io/reanahub/env:master");
    let spec = spec_with_images(&["python", "reanahub/env:master"]);

    let report = EnvironmentValidator::new()
        .validate(&spec, &lookup)
        .await
        .unwrap();

    let warnings: Vec<_> = report
        .findings()
        .into_iter()
        .filter(|finding| finding.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].message.contains("does not have an explicit tag"));
    assert!(warnings[1].message.contains("'master'"));
    assert!(!report.has_errors());
}
