//! Run bundles through the processing pipeline.
//!
//! Prints one line per produced asset with its final location and the storage
//! key its content was written under. With `--output` the stored content is
//! also written to files, one per storage key.
//!
//! # Examples
//!
//! ```bash
//! abm build app --url /shop/index.html
//! abm build app admin --output dist --stats
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::common::{CommandContext, GlobalOptions, OutputFormat};
use crate::pipeline::ProcessedAsset;
use crate::storage::StoreStats;

/// Command to process bundles.
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Bundles to process
    #[arg(required = true)]
    names: Vec<String>,

    /// URL of the request the bundles are processed for
    #[arg(short, long, default_value = "/")]
    url: String,

    /// Directory to write processed content to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print content store statistics
    #[arg(long)]
    stats: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct BuiltAsset<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    asset_type: String,
    location: &'a str,
    version: &'a str,
    storage_key: Option<&'a str>,
    aggregate: bool,
}

impl<'a> From<&'a ProcessedAsset> for BuiltAsset<'a> {
    fn from(processed: &'a ProcessedAsset) -> Self {
        Self {
            name: &processed.asset.name,
            asset_type: processed.asset_type.to_string(),
            location: &processed.location,
            version: &processed.version,
            storage_key: processed.storage_key.as_deref(),
            aggregate: processed.is_aggregate(),
        }
    }
}

#[derive(Serialize)]
struct BuildOutput<'a> {
    assets: Vec<BuiltAsset<'a>>,
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<StoreStats>,
}

impl BuildCommand {
    /// Execute the command.
    ///
    /// Degraded assets are reported as warnings and do not fail the command.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails, a name is not a loaded bundle, or
    /// the output directory cannot be written.
    pub async fn execute(self, options: &GlobalOptions) -> Result<()> {
        let ctx = CommandContext::load(options).await?;
        ctx.require_bundles(&self.names)?;

        let request = ctx.engine.request(&self.url);
        let outcome = ctx.engine.process(&self.names, &request);

        if let Some(dir) = &self.output {
            write_output(dir, &outcome.assets).await?;
        }

        let stats = self.stats.then(|| ctx.engine.stats());

        match self.format {
            OutputFormat::Json => {
                let output = BuildOutput {
                    assets: outcome.assets.iter().map(BuiltAsset::from).collect(),
                    warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
                    stats,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                for warning in &outcome.warnings {
                    eprintln!("{} {}", "warning:".yellow().bold(), warning);
                }
                for processed in &outcome.assets {
                    let key = processed.storage_key.as_deref().unwrap_or("-");
                    println!(
                        "{:<4} {} {}",
                        processed.asset_type.to_string().cyan(),
                        processed.location,
                        key.dimmed()
                    );
                }
                if let Some(stats) = stats {
                    println!("{stats}");
                }
            }
        }

        Ok(())
    }
}

/// File name for a storage key.
fn output_file_name(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn write_output(dir: &Path, assets: &[ProcessedAsset]) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for processed in assets {
        let (Some(key), Some(entry)) = (&processed.storage_key, &processed.entry) else {
            continue;
        };
        let path = dir.join(output_file_name(key));
        tokio::fs::write(&path, entry.content())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Wrote {}", path.display());
    }
    Ok(())
}
