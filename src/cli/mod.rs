//! Command-line interface for ABM.
//!
//! This module contains all CLI commands and their implementations. The CLI
//! uses the clap crate for argument parsing and follows a subcommand
//! pattern similar to cargo.
//!
//! # Available Commands
//!
//! - `validate` - Check every loaded bundle definition
//! - `resolve` - List bundles and assets in dependency order
//! - `tree` - Display a bundle's dependency tree
//! - `build` - Run bundles through the pipeline
//!
//! # Global Options
//!
//! All commands support these global options:
//! - `--verbose` / `-v` - Enable debug logging
//! - `--quiet` / `-q` - Only log errors
//! - `--config` / `-c` - Path to the configuration file (default `abm.toml`)
//! - `--bundles-dir` - Directory holding the JSON bundle definitions
//!
//! Without `--verbose` or `--quiet`, `RUST_LOG` is honored when set and
//! logging defaults to `info`. Logs go to stderr so JSON output on stdout
//! stays machine-readable.
//!
//! # Examples
//!
//! ```bash
//! abm validate
//! abm --verbose resolve app --format json
//! abm --config site/abm.toml build app --url /index.html --stats
//! ```

mod build;
mod common;
mod resolve;
mod tree;
mod validate;

pub use common::{CommandContext, GlobalOptions, OutputFormat};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Main CLI structure for ABM.
#[derive(Parser)]
#[command(
    name = "abm",
    about = "Asset Bundle Manager - Resolve and process web asset bundles",
    version,
    long_about = "ABM turns declarative bundle definitions into ordered, processed stylesheet and script assets."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to `RUST_LOG=debug`)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    ///
    /// Defaults to `abm.toml` next to the bundle directory. An explicit path
    /// must exist; the default one is optional.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the JSON bundle definitions
    ///
    /// Overrides `bundles_dir` from the configuration file.
    #[arg(long, global = true)]
    bundles_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every loaded bundle definition
    Validate(validate::ValidateCommand),

    /// List bundles and their assets in dependency order
    Resolve(resolve::ResolveCommand),

    /// Show the dependency tree of a bundle
    Tree(tree::TreeCommand),

    /// Process bundles and report storage keys
    Build(build::BuildCommand),
}

impl Cli {
    /// Execute the CLI with the parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns the error of the executed command.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.log_filter());

        let options = GlobalOptions {
            config_path: self.config,
            bundles_dir: self.bundles_dir,
        };

        match self.command {
            Commands::Validate(cmd) => cmd.execute(&options).await,
            Commands::Resolve(cmd) => cmd.execute(&options).await,
            Commands::Tree(cmd) => cmd.execute(&options).await,
            Commands::Build(cmd) => cmd.execute(&options).await,
        }
    }

    /// Log filter selected by the verbosity flags.
    ///
    /// `None` means "use `RUST_LOG`, falling back to `info`".
    #[must_use]
    fn log_filter(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
