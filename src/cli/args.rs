// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the validate and diff subcommands of wfcheck

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::parser::Engine;

#[derive(Parser)]
#[command(name = "wfcheck")]
#[command(about = "Validate and compare declarative research workflow specifications")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a workflow specification file
    Validate {
        #[arg(help = "Path to the specification file (reana.yaml)")]
        spec: PathBuf,

        #[arg(
            short = 'P',
            long = "parameter",
            help = "Override input parameters (name=value)"
        )]
        parameters: Vec<String>,

        #[arg(long, help = "Workflow engine when the file does not declare one")]
        engine: Option<Engine>,

        #[arg(long, help = "Check that environment images exist in their registries")]
        environments: bool,

        #[arg(long, help = "Maximum number of concurrent registry lookups")]
        max_lookups: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show differences between two workflow specifications
    Diff {
        #[arg(help = "Specification of the first workflow")]
        spec_a: PathBuf,

        #[arg(help = "Specification of the second workflow")]
        spec_b: PathBuf,

        #[arg(long, requires = "workspace_b", help = "Workspace directory of the first workflow")]
        workspace_a: Option<PathBuf>,

        #[arg(long, requires = "workspace_a", help = "Workspace directory of the second workflow")]
        workspace_b: Option<PathBuf>,

        #[arg(long, help = "Ignore file applied to workspace listings")]
        ignore_file: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse parameter overrides from name=value format
    pub fn parse_parameters(parameters: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
        let mut parsed = BTreeMap::new();

        for parameter in parameters {
            match parameter.split_once('=') {
                Some((name, value)) if !name.trim().is_empty() => {
                    parsed.insert(name.trim().to_string(), value.to_string());
                }
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid parameter format '{}'. Expected 'name=value'",
                        parameter
                    ));
                }
            }
        }

        Ok(parsed)
    }
}
