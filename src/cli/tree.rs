//! Display the dependency tree of a bundle.
//!
//! The tree is drawn with box-drawing characters, similar to `cargo tree`.
//! A bundle reached a second time is shown once and then marked
//! `(shown above)`; bundles that are referenced but never defined are marked
//! `(undefined)`.
//!
//! # Examples
//!
//! ```bash
//! abm tree app
//! ```
//!
//! ```text
//! app
//! ├── jquery
//! └── widgets
//!     └── jquery (shown above)
//! ```

use anyhow::Result;
use clap::Args;

use super::common::{CommandContext, GlobalOptions};

/// Command to print a bundle's dependency tree.
#[derive(Args, Debug)]
pub struct TreeCommand {
    /// Root bundle
    name: String,
}

impl TreeCommand {
    /// Execute the command.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the bundle is not loaded.
    pub async fn execute(self, options: &GlobalOptions) -> Result<()> {
        let ctx = CommandContext::load(options).await?;
        ctx.require_bundles(std::slice::from_ref(&self.name))?;

        if let Some(tree) = ctx.engine.bundles().graph().to_tree_string(&self.name) {
            print!("{tree}");
        }
        Ok(())
    }
}
