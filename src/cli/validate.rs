//! Validate loaded bundle definitions.
//!
//! Loading already rejects malformed files and dependency cycles; this command
//! additionally checks every bundle's content and reports all problems at once.
//!
//! # Examples
//!
//! ```bash
//! abm validate
//! abm validate --format json
//! abm --bundles-dir site/bundles validate
//! ```
//!
//! The command exits with a non-zero status when any bundle is invalid.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::common::{CommandContext, GlobalOptions, OutputFormat};
use crate::resolver::ValidationReport;

/// Command to validate every loaded bundle.
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct ValidationOutput {
    valid: bool,
    bundles: usize,
    errors: Vec<ValidationReport>,
}

impl ValidateCommand {
    /// Execute the command.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or any bundle is invalid.
    pub async fn execute(self, options: &GlobalOptions) -> Result<()> {
        let ctx = CommandContext::load(options).await?;
        let store = ctx.engine.bundles();

        let mut reports: Vec<ValidationReport> = store
            .graph()
            .bundles()
            .filter_map(|bundle| store.validate(&bundle.name))
            .filter(|report| !report.is_valid())
            .collect();
        reports.sort_by(|a, b| a.bundle.cmp(&b.bundle));

        let total = store.graph().len();
        let invalid = reports.len();

        match self.format {
            OutputFormat::Json => {
                let output = ValidationOutput {
                    valid: reports.is_empty(),
                    bundles: total,
                    errors: reports,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                for report in &reports {
                    println!("{} {}", "✗".red(), report.bundle.bold());
                    for reason in &report.reasons {
                        println!("    - {reason}");
                    }
                }
                if invalid == 0 {
                    println!("{} All {} bundle(s) are valid", "✓".green(), total);
                }
            }
        }

        if invalid > 0 {
            return Err(anyhow::anyhow!("{invalid} of {total} bundle(s) failed validation"));
        }
        Ok(())
    }
}
