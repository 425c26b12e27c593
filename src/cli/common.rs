//! Common utilities for CLI commands

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::constants::DEFAULT_CONFIG_FILE;
use crate::core::AbmError;
use crate::engine::{AssetEngine, AssetEngineBuilder};
use crate::loader::{JsonBundleLoader, LoaderKind};

/// Output format shared by the reporting commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

/// Paths given through the global CLI flags.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit configuration file (`--config`)
    pub config_path: Option<PathBuf>,
    /// Bundle directory override (`--bundles-dir`)
    pub bundles_dir: Option<PathBuf>,
}

impl GlobalOptions {
    /// Configuration file to read.
    ///
    /// Without `--config` this is `abm.toml` next to the bundle directory, or
    /// in the current directory when no bundle directory was given.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        if let Some(path) = &self.config_path {
            return path.clone();
        }
        self.bundles_dir
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), |dir| dir.join(DEFAULT_CONFIG_FILE))
    }
}

/// Loaded configuration and engine for one command run
#[derive(Debug)]
pub struct CommandContext {
    /// Configuration file that was looked for
    pub config_path: PathBuf,
    /// Engine with every bundle definition loaded
    pub engine: AssetEngine,
}

impl CommandContext {
    /// Load configuration, build the engine and load the bundle directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit configuration file is missing or
    /// invalid, the bundle directory cannot be read, or a definition fails to
    /// parse or closes a dependency cycle.
    pub async fn load(options: &GlobalOptions) -> Result<Self> {
        let config_path = options.config_file();

        let mut config = if options.config_path.is_some() {
            if !config_path.exists() {
                return Err(anyhow::anyhow!("Configuration file {} not found", config_path.display()));
            }
            EngineConfig::load_from(&config_path).await?
        } else {
            EngineConfig::load_or_default(&config_path).await?
        };

        if let Some(dir) = &options.bundles_dir {
            config.bundles_dir.clone_from(dir);
        }

        let bundles_dir = config.bundles_dir.clone();
        let mut engine = AssetEngineBuilder::new(config).build()?;

        let loader = JsonBundleLoader::new("bundles", LoaderKind::User, &bundles_dir);
        let summary = engine
            .load_from(&[&loader])
            .with_context(|| format!("Failed to load bundles from {}", bundles_dir.display()))?;

        tracing::info!("Loaded {} bundle definition(s) from {}", summary.total(), bundles_dir.display());

        Ok(Self {
            config_path,
            engine,
        })
    }

    /// Fail with [`AbmError::BundleNotFound`] for the first name that is not
    /// a loaded bundle.
    ///
    /// # Errors
    ///
    /// Returns the error described above.
    pub fn require_bundles(&self, names: &[String]) -> Result<(), AbmError> {
        let graph = self.engine.bundles().graph();
        match names.iter().find(|name| !graph.contains(name)) {
            Some(name) => Err(AbmError::BundleNotFound {
                name: name.clone(),
            }),
            None => Ok(()),
        }
    }
}
