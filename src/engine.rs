//! The [`AssetEngine`] handle.
//!
//! The engine owns everything needed to serve asset requests: the bundle
//! store, the registries, the pipeline and the content store. There is no
//! global state; callers create an engine with an [`AssetEngineBuilder`] and
//! pass it around (usually behind an `Arc` once loading is done).
//!
//! # Lifecycle
//!
//! 1. **Build**: registries are assembled once from the configuration plus any
//!    caller-supplied locators, processors and versioning strategies.
//! 2. **Load**: [`AssetEngine::load_from`] runs the loaders and consolidates
//!    their bundles. This takes `&mut self`.
//! 3. **Serve**: [`AssetEngine::process`] and [`AssetEngine::entry`] take
//!    `&self` and may be called from many threads at once.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use abm_cli::config::EngineConfig;
//! use abm_cli::core::{AssetUnit, BundleUnit};
//! use abm_cli::engine::AssetEngineBuilder;
//! use abm_cli::pipeline::InMemoryLocator;
//!
//! let memory = InMemoryLocator::new("memory");
//! memory.insert("app.js", "var app;");
//!
//! let mut engine = AssetEngineBuilder::new(EngineConfig::default())
//!     .with_locator(Arc::new(memory))
//!     .build()
//!     .unwrap();
//!
//! engine.load(vec![
//!     BundleUnit::new("app").with_asset(AssetUnit::new("app", "1").with_location("memory", "app.js")),
//! ]).unwrap();
//!
//! let outcome = engine.process(&["app"], &engine.request("/index.html"));
//! let key = outcome.storage_keys()[0].to_string();
//! assert!(engine.entry(&key).is_some());
//! ```

use anyhow::Result;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::{AbmError, BundleUnit, ResolvedBundle};
use crate::loader::{LoadSummary, Loader, load_all};
use crate::pipeline::{
    CdnLocator, FileLocator, Locator, LocatorRegistry, Pipeline, ProcessOutcome, Processor, ProcessorRegistry,
    RequestContext, WebappLocator,
};
use crate::resolver::BundleStore;
use crate::storage::{ContentStore, StorageEntry, StoreStats, content_store_with_capacity};
use crate::versioning::{VersioningRegistry, VersioningStrategy};

/// Builder for [`AssetEngine`].
///
/// Without customization the engine uses the `webapp`, `file` and `cdn`
/// locators rooted as configured, the built-in processors, the built-in
/// versioning strategies, and a content store sized by `cache_max_entries`.
pub struct AssetEngineBuilder {
    config: EngineConfig,
    locators: Vec<Arc<dyn Locator>>,
    processors: Vec<Arc<dyn Processor>>,
    strategies: Vec<Arc<dyn VersioningStrategy>>,
    content_store: Option<Arc<dyn ContentStore>>,
}

impl AssetEngineBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            locators: Vec::new(),
            processors: Vec::new(),
            strategies: Vec::new(),
            content_store: None,
        }
    }

    /// Register an additional locator, replacing a built-in one with the same
    /// key.
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn Locator>) -> Self {
        self.locators.push(locator);
        self
    }

    /// Register an additional processor.
    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Register an additional versioning strategy.
    #[must_use]
    pub fn with_versioning_strategy(mut self, strategy: Arc<dyn VersioningStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Use a specific content store instead of one built from configuration.
    #[must_use]
    pub fn with_content_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.content_store = Some(store);
        self
    }

    /// Assemble the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, a processor uses the
    /// reserved rank 0, or the configured versioning strategy is unknown.
    pub fn build(self) -> Result<AssetEngine, AbmError> {
        self.config.validate()?;

        let mut locators = LocatorRegistry::new();
        locators.register(Arc::new(WebappLocator::new(&self.config.webapp_root)));
        let file = FileLocator::new(&self.config.file_root, self.config.file_url_prefix.as_str());
        locators.register(Arc::new(file));
        locators.register(Arc::new(CdnLocator));
        for locator in self.locators {
            locators.register(locator);
        }

        let mut processors = ProcessorRegistry::with_defaults()?;
        for processor in self.processors {
            processors.register(processor)?;
        }

        let mut versioning = VersioningRegistry::with_defaults(&self.config.fixed_version);
        for strategy in self.strategies {
            versioning.register(strategy);
        }

        let content =
            self.content_store.unwrap_or_else(|| content_store_with_capacity(self.config.cache_max_entries));

        tracing::debug!(
            "Building engine: locators {:?}, processors {:?}, versioning '{}'",
            locators.keys(),
            processors.keys(),
            self.config.versioning
        );

        let pipeline =
            Pipeline::new(self.config.clone(), locators, processors, &versioning, Arc::clone(&content))?;

        Ok(AssetEngine {
            config: self.config,
            bundles: BundleStore::new(),
            pipeline,
            content,
        })
    }
}

/// Explicit handle to a configured asset engine.
#[derive(Debug)]
pub struct AssetEngine {
    config: EngineConfig,
    bundles: BundleStore,
    pipeline: Pipeline,
    content: Arc<dyn ContentStore>,
}

impl AssetEngine {
    /// The configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The bundle store.
    #[must_use]
    pub const fn bundles(&self) -> &BundleStore {
        &self.bundles
    }

    /// Consolidate bundles directly.
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::CircularDependency`]; nothing is loaded then.
    pub fn load(&mut self, units: Vec<BundleUnit>) -> Result<(), AbmError> {
        self.bundles.load(units)
    }

    /// Run loaders in precedence order.
    ///
    /// # Errors
    ///
    /// Returns the first loader or consolidation failure.
    pub fn load_from(&mut self, loaders: &[&dyn Loader]) -> Result<LoadSummary> {
        load_all(&mut self.bundles, loaders)
    }

    /// Bundles needed for `names`, dependencies first.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Vec<ResolvedBundle> {
        self.bundles.resolve(names)
    }

    /// Every invalid bundle, one error each.
    #[must_use]
    pub fn validate_all(&self) -> Vec<AbmError> {
        self.bundles.validate_all()
    }

    /// Request context for `url` using the configured context path.
    #[must_use]
    pub fn request(&self, url: &str) -> RequestContext {
        RequestContext::new(url, self.config.context_path.clone())
    }

    /// Resolve and process the bundles of one request.
    #[must_use]
    pub fn process<S: AsRef<str>>(&self, names: &[S], request: &RequestContext) -> ProcessOutcome {
        let assets = self.bundles.resolve_assets(names);
        self.pipeline.process(&assets, request)
    }

    /// Stored entry for a storage key, for the serving layer.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<Arc<StorageEntry>> {
        self.content.get(key)
    }

    /// The content store.
    #[must_use]
    pub const fn content_store(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    /// Content store counters.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.content.stats()
    }
}
