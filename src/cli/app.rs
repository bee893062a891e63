// ABOUTME: Main application orchestration for the wfcheck CLI
// ABOUTME: Coordinates between CLI arguments, configuration, and command execution

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands::{self, DiffOptions, ValidateOptions};
use super::{Args, Commands, Config};

pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging based on configuration; logs go to stderr
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let log_level = if verbose {
            "debug"
        } else {
            &self.config.logging.level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(!no_color)
            .with_target(false);

        let initialized = match self.config.logging.format.as_str() {
            "compact" => builder.compact().try_init(),
            _ => builder.try_init(),
        };
        initialized.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Run the application with parsed arguments
    pub async fn run(&self, args: Args) -> Result<()> {
        self.init_logging(args.verbose, args.no_color)?;

        info!("Starting wfcheck v{}", env!("CARGO_PKG_VERSION"));
        debug!("Configuration loaded from: {:?}", args.config);

        match args.command {
            Commands::Validate {
                spec,
                parameters,
                engine,
                environments,
                max_lookups,
                format,
            } => {
                let options = ValidateOptions {
                    parameters,
                    engine,
                    environments,
                    max_lookups,
                    format,
                };
                commands::validate_specification(spec, options, &self.config).await
            }

            Commands::Diff {
                spec_a,
                spec_b,
                workspace_a,
                workspace_b,
                ignore_file,
                format,
            } => {
                let options = DiffOptions {
                    workspace_a,
                    workspace_b,
                    ignore_file,
                    format,
                };
                commands::diff_specifications(spec_a, spec_b, options, &self.config).await
            }
        }
    }
}
