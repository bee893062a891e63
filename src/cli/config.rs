// ABOUTME: Configuration management for wfcheck
// ABOUTME: Handles loading and merging configuration from files and environment variables

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::validation::environments::DEFAULT_MAX_CONCURRENT_LOOKUPS;
use crate::validation::resources::DEFAULT_COMPUTE_BACKENDS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_concurrent_lookups: usize,

    /// Overall deadline of one environment validation
    #[serde(with = "humantime_serde")]
    pub lookup_timeout: Duration,

    /// Timeout of a single registry request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    pub ignore_file: PathBuf,

    /// Compute backends a step may request
    pub compute_backends: Vec<String>,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
            lookup_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            ignore_file: PathBuf::from(".reanaignore"),
            compute_backends: DEFAULT_COMPUTE_BACKENDS.iter().map(|b| b.to_string()).collect(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file(),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            serde_yaml::from_str(&contents)?
        } else {
            Config::default()
        };

        config.merge_env()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> PathBuf {
        let possible_paths = [
            PathBuf::from("wfcheck.yaml"),
            PathBuf::from("wfcheck.yml"),
            PathBuf::from(".wfcheck.yaml"),
            PathBuf::from(".wfcheck.yml"),
        ];

        for path in possible_paths {
            if path.exists() {
                return path;
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".wfcheck").join("config.yaml");
            if home_config.exists() {
                return home_config;
            }
        }

        // Default path (may not exist)
        PathBuf::from("wfcheck.yaml")
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        if let Ok(max_lookups) = std::env::var("WFCHECK_MAX_LOOKUPS") {
            self.max_concurrent_lookups = max_lookups.parse()?;
        }
        if let Ok(timeout) = std::env::var("WFCHECK_LOOKUP_TIMEOUT") {
            self.lookup_timeout = humantime::parse_duration(&timeout)?;
        }
        if let Ok(backends) = std::env::var("WFCHECK_COMPUTE_BACKENDS") {
            self.compute_backends = backends
                .split(',')
                .map(str::trim)
                .filter(|backend| !backend.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(level) = std::env::var("WFCHECK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WFCHECK_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }
}
