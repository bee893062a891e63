// ABOUTME: Integration tests for ignore rule compilation and matching
// ABOUTME: Exercises last-match-wins, directory pruning and ignore-file parsing

use chrono::Utc;

use wfcheck::diff::{FileStat, WorkspaceListing};
use wfcheck::ignore::{IgnoreRuleSet, PatternError};

mod common;

use common::TestEnvironment;

#[test]
fn test_no_matching_rule_means_included() {
    let rules = IgnoreRuleSet::compile(["*.pyc", "/build/"]).unwrap();
    assert!(!rules.is_excluded("code/fit.py", false));
    assert!(!rules.is_excluded("src/build", true));
}

#[test]
fn test_last_matching_rule_decides() {
    let rules = IgnoreRuleSet::compile(["*.root", "!results/*.root", "results/tmp*.root"]).unwrap();

    assert!(rules.is_excluded("data/raw.root", false));
    assert!(!rules.is_excluded("results/data.root", false));
    assert!(rules.is_excluded("results/tmp1.root", false));
}

#[test]
fn test_excluded_directory_excludes_subtree() {
    let rules = IgnoreRuleSet::compile(["/workspace/cache", "!/workspace/cache/keep.txt"]).unwrap();

    assert!(rules.is_excluded("workspace/cache", true));
    assert!(rules.is_excluded("workspace/cache/keep.txt", false));
    assert!(rules.is_excluded("workspace/cache/a/b/c.dat", false));
    assert!(!rules.is_excluded("workspace/other.txt", false));
}

#[test]
fn test_directory_only_rule_ignores_files_with_same_name() {
    let rules = IgnoreRuleSet::compile(["logs/"]).unwrap();
    assert!(!rules.is_excluded("logs", false));
    assert!(rules.is_excluded("logs", true));
    assert!(rules.is_excluded("step1/logs/out.txt", false));
}

#[test]
fn test_globstar_patterns() {
    let rules = IgnoreRuleSet::compile(["**/__pycache__/", "data/**/*.csv"]).unwrap();
    assert!(rules.is_excluded("code/pkg/__pycache__/mod.pyc", false));
    assert!(rules.is_excluded("data/2024/05/run.csv", false));
    assert!(rules.is_excluded("data/run.csv", false));
    assert!(!rules.is_excluded("other/run.csv", false));
}

#[test]
fn test_unsupported_syntax_reports_pattern_and_position() {
    let error = IgnoreRuleSet::compile(["*.log", "src/{a,b}/*.c"]).unwrap_err();

    assert_eq!(error.pattern(), "src/{a,b}/*.c");
    assert_eq!(error.position(), Some(4));
    assert!(matches!(error, PatternError::UnsupportedCharacter { index: 1, character: '{', .. }));
}

#[test]
fn test_parse_ignore_file() {
    let env = TestEnvironment::new();
    let path = env.write(
        ".reanaignore",
        "# generated files\n*.pyc\n\n/results/\n!results/keep.txt\n\\!bang\n",
    );
    let rules = IgnoreRuleSet::parse(&std::fs::read_to_string(path).unwrap()).unwrap();

    assert_eq!(rules.len(), 4);
    assert!(rules.is_excluded("code/fit.pyc", false));
    assert!(rules.is_excluded("results/keep.txt", false));
    assert!(rules.is_excluded("!bang", false));
}

#[test]
fn test_workspace_listing_without_ignored_paths() {
    let mut listing = WorkspaceListing::new();
    for path in ["code/fit.py", "code/fit.pyc", "results/plot.png", "results/cache/x.bin"] {
        listing.insert(path, FileStat::new(1, Utc::now()));
    }

    let rules = IgnoreRuleSet::compile(["*.pyc", "results/cache/"]).unwrap();
    let filtered = listing.without_ignored(&rules);
    let paths: Vec<&str> = filtered.paths().collect();

    assert_eq!(paths, vec!["code/fit.py", "results/plot.png"]);
}
