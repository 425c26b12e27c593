//! List the assets of bundles in dependency order.
//!
//! # Examples
//!
//! ```bash
//! abm resolve app
//! abm resolve app admin --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, GlobalOptions, OutputFormat};

/// Command to resolve bundle names.
#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Bundles to resolve
    #[arg(required = true)]
    names: Vec<String>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ResolveCommand {
    /// Execute the command.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or a name is not a loaded bundle.
    pub async fn execute(self, options: &GlobalOptions) -> Result<()> {
        let ctx = CommandContext::load(options).await?;
        ctx.require_bundles(&self.names)?;

        let bundles = ctx.engine.resolve(&self.names);

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&bundles)?),
            OutputFormat::Text => {
                for bundle in &bundles {
                    let marker = if bundle.vendor { " (vendor)".dimmed().to_string() } else { String::new() };
                    println!("{}{}", bundle.name.bold(), marker);
                    for asset in &bundle.assets {
                        let locations: Vec<String> =
                            asset.locations.iter().map(|(key, value)| format!("{key}={value}")).collect();
                        println!("  {} {} [{}]", asset.key().cyan(), asset.version, locations.join(", "));
                    }
                }
            }
        }

        Ok(())
    }
}
