//! Loader for JSON bundle definition files.
//!
//! Every `*.json` file below the root directory holds either one bundle
//! definition or an array of them:
//!
//! ```json
//! {
//!   "bundle": "app",
//!   "dependencies": ["jquery"],
//!   "assets": [
//!     { "name": "app", "version": "1.0", "locations": { "webapp": "/js/app.js" } },
//!     { "version": "1.0", "locations": { "webapp": "/css/app.css" } }
//!   ]
//! }
//! ```
//!
//! Files are read in path order so loading is deterministic. Symlinks are not
//! followed.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{Loader, LoaderKind};
use crate::core::{AbmError, BundleUnit};

/// Reads bundle definitions from a directory tree.
#[derive(Debug, Clone)]
pub struct JsonBundleLoader {
    name: String,
    kind: LoaderKind,
    root: PathBuf,
}

impl JsonBundleLoader {
    /// Loader reading `*.json` files below `root`.
    pub fn new(name: impl Into<String>, kind: LoaderKind, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            root: root.into(),
        }
    }

    /// Directory the loader reads from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn parse_file(&self, path: &Path) -> Result<Vec<BundleUnit>> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

        // Parse the form the file starts with so errors name the offending field
        let parsed = if content.trim_start().starts_with('[') {
            serde_json::from_str::<Vec<BundleUnit>>(&content)
        } else {
            serde_json::from_str::<BundleUnit>(&content).map(|unit| vec![unit])
        };
        let mut units = parsed.map_err(|e| AbmError::BundleDefinitionParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
        for unit in &mut units {
            unit.relative_path = Some(relative.clone());
        }
        Ok(units)
    }
}

impl Loader for JsonBundleLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> LoaderKind {
        self.kind
    }

    fn load(&self) -> Result<Vec<BundleUnit>> {
        if !self.root.is_dir() {
            bail!("Bundle directory not found: {}", self.root.display());
        }

        let mut units = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("Failed to read directory entry in: {}", self.root.display()))?;
            let path = entry.path();

            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
                let parsed = self.parse_file(path)?;
                tracing::debug!("Read {} bundle(s) from {}", parsed.len(), path.display());
                units.extend(parsed);
            }
        }

        Ok(units)
    }
}
