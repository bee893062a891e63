// ABOUTME: Presentation of validation findings and diff entries
// ABOUTME: Supports human-readable text and machine-readable JSON output

pub mod error;
pub mod formatter;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::Write;

pub use self::error::{OutputError, Result};
pub use self::formatter::{FindingSection, JsonFormatter, OutputFormatter, TextFormatter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter::new()),
            OutputFormat::Json => Box::new(JsonFormatter::new_pretty()),
        }
    }
}

/// Write rendered output followed by a newline
pub fn emit(writer: &mut impl Write, rendered: &str) -> Result<()> {
    writer.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
