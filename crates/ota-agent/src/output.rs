//! Output formatting for ota-agent (table, json)

use clap::ValueEnum;
use colored::Colorize;
use ota_client::UpdateDescriptor;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print a single item in the configured format
    pub fn print_one<T: Tabled + Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Table => {
                let table = Table::new([data]).to_string();
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
    }
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// Update display for check and fetch commands
#[derive(Debug, Tabled, Serialize)]
pub struct UpdateRow {
    #[tabled(rename = "Deployment")]
    pub deployment: String,
    #[tabled(rename = "Image")]
    pub image: String,
    #[tabled(rename = "Variant")]
    pub variant: String,
    #[tabled(rename = "Checksum")]
    pub checksum: String,
    #[tabled(rename = "URI")]
    pub uri: String,
}

impl From<&UpdateDescriptor> for UpdateRow {
    fn from(update: &UpdateDescriptor) -> Self {
        Self {
            deployment: update.id.clone(),
            image: update.image.id.clone(),
            variant: update.image.variant_id.clone(),
            checksum: update.image.checksum.clone(),
            uri: update.image.uri.clone(),
        }
    }
}
