//! Test utilities for ABM
//!
//! Helpers shared by unit and integration tests:
//! - [`init_test_logging`] to see `tracing` output from tests
//! - [`BundleDir`] for temporary directories of JSON bundle definitions
//! - [`FailingProcessor`] and [`CountingProcessor`] to exercise the pipeline's
//!   degradation and caching paths
//! - [`memory_engine`] for an engine backed by in-memory content
//!
//! # Example
//!
//! ```rust,no_run
//! use abm_cli::test_utils::BundleDir;
//!
//! let dir = BundleDir::new().unwrap();
//! dir.write("app.json", r#"{ "bundle": "app" }"#).unwrap();
//! assert!(dir.bundles_path().join("app.json").exists());
//! ```

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::core::AssetType;
use crate::engine::{AssetEngine, AssetEngineBuilder};
use crate::pipeline::{InMemoryLocator, ProcessingContext, Processor};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `None` the `RUST_LOG` environment
/// variable decides; when it is unset nothing is logged.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Temporary project with a `bundles/` directory.
///
/// The layout mirrors what the CLI expects: `abm.toml` at the root, bundle
/// definitions below `bundles/`.
pub struct BundleDir {
    temp: TempDir,
}

impl BundleDir {
    /// Create an empty project.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        std::fs::create_dir_all(temp.path().join("bundles"))?;
        Ok(Self {
            temp,
        })
    }

    /// Project root.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// The `bundles/` directory.
    pub fn bundles_path(&self) -> PathBuf {
        self.temp.path().join("bundles")
    }

    /// Write a bundle definition below `bundles/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        self.write_file(&Path::new("bundles").join(relative), content)
    }

    /// Write `abm.toml` at the project root.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_config(&self, content: &str) -> Result<PathBuf> {
        self.write_file(Path::new("abm.toml"), content)
    }

    /// Write any file relative to the project root.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_file(&self, relative: &Path, content: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

/// Processor that always fails.
#[derive(Debug, Clone)]
pub struct FailingProcessor {
    key: String,
    types: Vec<AssetType>,
}

impl FailingProcessor {
    /// Failing processor registered as `key`, compatible with every type.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            types: AssetType::ALL.to_vec(),
        }
    }
}

impl Processor for FailingProcessor {
    fn key(&self) -> &str {
        &self.key
    }

    fn compatible_types(&self) -> &[AssetType] {
        &self.types
    }

    fn process(&self, _content: &[u8], context: &ProcessingContext<'_>) -> Result<Vec<u8>> {
        bail!("{} refuses to process {}", self.key, context.asset.key())
    }
}

/// Processor that uppercases content and counts its invocations.
#[derive(Debug)]
pub struct CountingProcessor {
    key: String,
    types: Vec<AssetType>,
    calls: AtomicUsize,
}

impl CountingProcessor {
    /// Counting processor registered as `key`, compatible with every type.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            types: AssetType::ALL.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times [`Processor::process`] ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Processor for CountingProcessor {
    fn key(&self) -> &str {
        &self.key
    }

    fn compatible_types(&self) -> &[AssetType] {
        &self.types
    }

    fn process(&self, content: &[u8], _context: &ProcessingContext<'_>) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(content.to_ascii_uppercase())
    }
}

/// Engine whose only location key is `memory`, serving `files`.
///
/// Extra processors are registered as given; the configuration's resolution
/// strategy is replaced by `["memory"]`.
///
/// # Errors
///
/// Returns an error if the engine cannot be built.
pub fn memory_engine(
    files: &[(&str, &str)],
    config: EngineConfig,
    processors: Vec<Arc<dyn Processor>>,
) -> Result<AssetEngine> {
    let memory = InMemoryLocator::new("memory");
    for (raw, content) in files {
        memory.insert(*raw, *content);
    }

    let config = EngineConfig {
        resolution_strategy: vec!["memory".to_string()],
        ..config
    };

    let mut builder = AssetEngineBuilder::new(config).with_locator(Arc::new(memory));
    for processor in processors {
        builder = builder.with_processor(processor);
    }
    Ok(builder.build()?)
}
