//! ABM CLI entry point
//!
//! This is the main executable for the Asset Bundle Manager.
//! It handles command-line argument parsing, error display, and command execution.
//!
//! The CLI supports these commands:
//! - `validate` - Check every loaded bundle definition
//! - `resolve` - List the assets of bundles in dependency order
//! - `tree` - Show the dependency tree of a bundle
//! - `build` - Run bundles through the pipeline

use abm_cli::cli;
use abm_cli::core::error::user_friendly_error;
use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
