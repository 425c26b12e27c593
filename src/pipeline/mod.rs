//! Request-time asset processing.
//!
//! Given the ordered asset list of a request, the [`Pipeline`] produces the
//! list of assets to emit, each with a final location and, for local assets,
//! the stored processed content.
//!
//! # Stages
//!
//! For every asset, in order:
//!
//! 1. **Location resolution** ([`select_location`]) picks one candidate
//!    location and its [`Locator`]. Remote assets stop here and are referenced
//!    by URL.
//! 2. **Processing** fetches the raw content, computes the effective version,
//!    and runs the asset's [`ProcessorChain`]. The result is stored under a
//!    processing key; a later request with the same key is a cache hit.
//! 3. **Compression** (production only, when enabled) passes the processed
//!    content through the minifier configured for the type and stores it under
//!    a compression key.
//!
//! Then, across the request:
//!
//! 4. **Aggregation** (production only, when enabled) concatenates the stored
//!    content of consecutive assets of the same type into one aggregate served
//!    from [`aggregation_url_prefix`](crate::config::EngineConfig::aggregation_url_prefix).
//!    Remote, conditional and unprocessed assets keep their own entry and
//!    split the surrounding assets of their type into separate aggregates.
//!
//! # Degraded processing
//!
//! No request fails because of a single asset. Problems are recorded as
//! warnings on the [`ProcessOutcome`] and logged:
//!
//! | Problem                    | Effect on the asset                         |
//! |----------------------------|---------------------------------------------|
//! | no matching location       | dropped                                     |
//! | no locator for the key     | dropped                                     |
//! | unknown processor          | dropped                                     |
//! | content cannot be fetched  | emitted by URL, unprocessed                 |
//! | a processor fails          | emitted with its raw content, not stored    |
//! | the minifier fails         | emitted with its processed content          |
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use abm_cli::config::EngineConfig;
//! use abm_cli::core::AssetUnit;
//! use abm_cli::pipeline::{InMemoryLocator, LocatorRegistry, Pipeline, ProcessorRegistry, RequestContext};
//! use abm_cli::storage::MemoryContentStore;
//! use abm_cli::versioning::VersioningRegistry;
//!
//! let memory = InMemoryLocator::new("memory");
//! memory.insert("app.js", "var a = 1;");
//! let mut locators = LocatorRegistry::new();
//! locators.register(Arc::new(memory));
//!
//! let config = EngineConfig::default();
//! let pipeline = Pipeline::new(
//!     config.clone(),
//!     locators,
//!     ProcessorRegistry::with_defaults().unwrap(),
//!     &VersioningRegistry::with_defaults(&config.fixed_version),
//!     Arc::new(MemoryContentStore::new()),
//! ).unwrap();
//!
//! let asset = Arc::new(AssetUnit::new("app", "1").with_location("memory", "app.js"));
//! let outcome = pipeline.process(&[asset], &RequestContext::new("/index.html", ""));
//! assert!(outcome.warnings.is_empty());
//! ```

pub mod builtin;
pub mod location;
pub mod locators;
pub mod processor;

pub use builtin::{CssMinifier, CssUrlRewriter, JsMinifier};
pub use location::{Locator, LocatorRegistry, select_location};
pub use locators::{CdnLocator, FileLocator, InMemoryLocator, WebappLocator};
pub use processor::{Processor, ProcessorChain, ProcessorRegistry};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::constants::{AGGREGATE_KEY_PREFIX, CONTENT_HASH_LENGTH};
use crate::core::{AbmError, AssetType, AssetUnit};
use crate::storage::key::{aggregation_key, compression_key, processing_key};
use crate::storage::{ContentStore, StorageEntry};
use crate::versioning::{VersioningRegistry, VersioningStrategy};

/// Location key of aggregated assets.
pub const AGGREGATE_LOCATION: &str = "aggregate";

/// Concatenate URL segments with exactly one `/` between them.
pub(crate) fn join_url(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{prefix}/{path}")
}

/// The request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Request URL, including any query string
    pub url: String,
    /// Context path of the web application (`""` for the root)
    pub context_path: String,
}

impl RequestContext {
    /// Create a request context.
    pub fn new(url: impl Into<String>, context_path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            context_path: context_path.into(),
        }
    }
}

/// Everything a processor may need to know about the asset it transforms.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingContext<'a> {
    /// The asset being processed
    pub asset: &'a AssetUnit,
    /// Its resolved type
    pub asset_type: AssetType,
    /// Its final location
    pub location: &'a str,
    /// The request being served
    pub request: &'a RequestContext,
}

/// One asset of the processed output.
#[derive(Debug, Clone)]
pub struct ProcessedAsset {
    /// The source asset, or the synthetic asset of an aggregate
    pub asset: Arc<AssetUnit>,
    /// Resolved type
    pub asset_type: AssetType,
    /// Location key that was selected
    pub location_key: String,
    /// Final location
    pub location: String,
    /// Effective version
    pub version: String,
    /// Key of the stored content; `None` when nothing was stored
    pub storage_key: Option<String>,
    /// Content, when the asset was fetched
    pub entry: Option<Arc<StorageEntry>>,
}

impl ProcessedAsset {
    /// Whether the asset is an aggregate of several assets.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        self.entry.as_ref().is_some_and(|e| e.is_aggregate())
    }
}

/// Result of processing one request.
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    /// Assets to emit, in order
    pub assets: Vec<ProcessedAsset>,
    /// Problems that degraded the result without failing it
    pub warnings: Vec<AbmError>,
}

impl ProcessOutcome {
    /// Storage keys of the emitted assets, in order.
    #[must_use]
    pub fn storage_keys(&self) -> Vec<&str> {
        self.assets.iter().filter_map(|a| a.storage_key.as_deref()).collect()
    }
}

fn record(warnings: &mut Vec<AbmError>, warning: AbmError) {
    tracing::warn!("{}", warning);
    warnings.push(warning);
}

/// Runs assets through location resolution, processing, compression and
/// aggregation.
pub struct Pipeline {
    config: EngineConfig,
    locators: LocatorRegistry,
    processors: ProcessorRegistry,
    versioning: Arc<dyn VersioningStrategy>,
    store: Arc<dyn ContentStore>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("locators", &self.locators)
            .field("processors", &self.processors)
            .field("versioning", &self.versioning.name())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::UnknownVersioningStrategy`] when the configured
    /// strategy is not registered.
    pub fn new(
        config: EngineConfig,
        locators: LocatorRegistry,
        processors: ProcessorRegistry,
        versioning: &VersioningRegistry,
        store: Arc<dyn ContentStore>,
    ) -> Result<Self, AbmError> {
        let versioning = versioning.get(&config.versioning)?;
        Ok(Self {
            config,
            locators,
            processors,
            versioning,
            store,
        })
    }

    /// The store processed content is written to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Process the assets of one request.
    #[must_use]
    pub fn process(&self, assets: &[Arc<AssetUnit>], request: &RequestContext) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();

        for asset in assets {
            match self.process_asset(asset, request, &mut outcome.warnings) {
                Ok(processed) => outcome.assets.push(processed),
                Err(error) => record(&mut outcome.warnings, error),
            }
        }

        if self.config.aggregation_enabled() {
            outcome.assets = self.aggregate(outcome.assets);
        }

        tracing::debug!(
            "Processed request '{}': {} asset(s) emitted, {} warning(s)",
            request.url,
            outcome.assets.len(),
            outcome.warnings.len()
        );
        outcome
    }

    /// Process one asset. An `Err` drops the asset from the output.
    fn process_asset(
        &self,
        asset: &Arc<AssetUnit>,
        request: &RequestContext,
        warnings: &mut Vec<AbmError>,
    ) -> Result<ProcessedAsset, AbmError> {
        let asset_type = asset.resolved_type().ok_or_else(|| AbmError::InvalidAssetType {
            value: asset.key(),
        })?;

        let (location_key, raw) = select_location(asset, &self.config.resolution_strategy).ok_or_else(|| {
            AbmError::LocationUnresolved {
                asset: asset.key(),
            }
        })?;

        let locator = self.locators.get(location_key).ok_or_else(|| AbmError::UnknownLocator {
            key: location_key.to_string(),
        })?;

        let mut processed = ProcessedAsset {
            asset: Arc::clone(asset),
            asset_type,
            location_key: location_key.to_string(),
            location: locator.resolve(asset, raw, request),
            version: asset.version.clone(),
            storage_key: None,
            entry: None,
        };

        if locator.is_remote() && !locator.is_caching_forced() {
            tracing::debug!("Asset '{}' is remote, referencing {}", asset.key(), processed.location);
            return Ok(processed);
        }

        let chain = self.processors.chain_for(asset, asset_type, self.config.default_chain(asset_type))?;

        let raw_content = match locator.fetch_content(asset, raw, request) {
            Ok(content) => content,
            Err(e) => {
                record(
                    warnings,
                    AbmError::ContentFetchFailed {
                        asset: asset.key(),
                        location: processed.location.clone(),
                        reason: format!("{e:#}"),
                    },
                );
                return Ok(processed);
            }
        };

        processed.version = self.versioning.compute_version(asset, &raw_content);

        let context = ProcessingContext {
            asset,
            asset_type,
            location: &processed.location,
            request,
        };

        let key = processing_key(&request.url, &processed.location, asset_type, &processed.version);
        let entry = if let Some(hit) = self.store.get(&key) {
            tracing::debug!("Cache hit for '{}'", key);
            hit
        } else {
            match chain.run(&raw_content, &context) {
                Ok(content) => {
                    let entry = Arc::new(StorageEntry::Single {
                        asset: Arc::clone(asset),
                        content,
                    });
                    self.store.put(key.clone(), Arc::clone(&entry));
                    entry
                }
                Err(failure) => {
                    record(warnings, failure);
                    processed.entry = Some(Arc::new(StorageEntry::Single {
                        asset: Arc::clone(asset),
                        content: raw_content,
                    }));
                    return Ok(processed);
                }
            }
        };

        let (key, entry) = if self.config.minification_enabled() {
            self.compress(&chain, entry.as_ref(), &context, &processed.version, warnings)
                .unwrap_or((key, entry))
        } else {
            (key, entry)
        };

        processed.storage_key = Some(key);
        processed.entry = Some(entry);
        Ok(processed)
    }

    /// Minify processed content. `None` keeps the processed entry.
    fn compress(
        &self,
        chain: &ProcessorChain,
        entry: &StorageEntry,
        context: &ProcessingContext<'_>,
        version: &str,
        warnings: &mut Vec<AbmError>,
    ) -> Option<(String, Arc<StorageEntry>)> {
        let minifier_key = self.config.minifier_for(context.asset_type)?;
        if chain.contains(minifier_key) {
            return None;
        }

        let Some(minifier) = self.processors.get(minifier_key) else {
            record(
                warnings,
                AbmError::UnknownProcessor {
                    key: minifier_key.clone(),
                },
            );
            return None;
        };
        if !minifier.is_compatible(context.asset_type) {
            return None;
        }

        let key = compression_key(&context.request.url, context.location, context.asset_type, version);
        if let Some(hit) = self.store.get(&key) {
            return Some((key, hit));
        }

        match minifier.process(entry.content(), context) {
            Ok(content) => {
                let compressed = Arc::new(StorageEntry::Single {
                    asset: Arc::clone(entry.asset()),
                    content,
                });
                self.store.put(key.clone(), Arc::clone(&compressed));
                Some((key, compressed))
            }
            Err(e) => {
                record(
                    warnings,
                    AbmError::ProcessorFailure {
                        asset: context.asset.key(),
                        processor: minifier_key.clone(),
                        cause: format!("{e:#}"),
                    },
                );
                None
            }
        }
    }

    /// Replace runs of stored assets of the same type with one aggregate.
    ///
    /// A run ends at any asset of that type that cannot be aggregated (remote,
    /// conditional, unfetched or failed), so no member moves past an asset it
    /// may depend on. Each aggregate takes the position of its first member.
    fn aggregate(&self, processed: Vec<ProcessedAsset>) -> Vec<ProcessedAsset> {
        // Runs in first-seen order, each with the indices of its members
        let mut runs: Vec<(AssetType, Vec<usize>)> = Vec::new();
        let mut open: HashMap<AssetType, usize> = HashMap::new();
        for (index, asset) in processed.iter().enumerate() {
            let aggregatable =
                asset.storage_key.is_some() && asset.entry.is_some() && asset.asset.condition.is_none();
            if !aggregatable {
                open.remove(&asset.asset_type);
                continue;
            }
            match open.get(&asset.asset_type) {
                Some(&run) => runs[run].1.push(index),
                None => {
                    open.insert(asset.asset_type, runs.len());
                    runs.push((asset.asset_type, vec![index]));
                }
            }
        }

        let mut replacements: HashMap<usize, ProcessedAsset> = HashMap::new();
        let mut absorbed: HashSet<usize> = HashSet::new();

        for (asset_type, indices) in runs {
            let members: Vec<&ProcessedAsset> = indices.iter().map(|&i| &processed[i]).collect();
            let replacement = self.aggregate_group(asset_type, &members);
            replacements.insert(indices[0], replacement);
            absorbed.extend(indices.iter().skip(1));
        }

        processed
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !absorbed.contains(index))
            .map(|(index, asset)| replacements.remove(&index).unwrap_or(asset))
            .collect()
    }

    fn aggregate_group(&self, asset_type: AssetType, members: &[&ProcessedAsset]) -> ProcessedAsset {
        let identities: Vec<(String, &str)> =
            members.iter().map(|m| (m.asset.key(), m.version.as_str())).collect();
        let key = aggregation_key(identities.iter().map(|(k, v)| (k.as_str(), *v)), asset_type);
        let location = join_url(&self.config.aggregation_url_prefix, &key);

        let entry = if let Some(hit) = self.store.get(&key) {
            tracing::debug!("Cache hit for aggregate '{}'", key);
            hit
        } else {
            let mut content = Vec::new();
            for member in members {
                if let Some(entry) = &member.entry {
                    content.extend_from_slice(entry.content());
                    content.push(b'\n');
                }
            }

            let entry = Arc::new(StorageEntry::Aggregate {
                asset: Arc::new(synthetic_asset(&key, &location, asset_type, &members[0].asset)),
                constituents: members.iter().map(|m| Arc::clone(&m.asset)).collect(),
                content,
            });
            self.store.put(key.clone(), Arc::clone(&entry));
            tracing::debug!("Aggregated {} {} asset(s) into '{}'", members.len(), asset_type, key);
            entry
        };

        ProcessedAsset {
            asset: Arc::clone(entry.asset()),
            asset_type,
            location_key: AGGREGATE_LOCATION.to_string(),
            location,
            version: entry.asset().version.clone(),
            storage_key: Some(key),
            entry: Some(entry),
        }
    }
}

/// Asset standing for an aggregate.
///
/// Named after the storage key, versioned by its hash, placed where its
/// first constituent goes.
fn synthetic_asset(key: &str, location: &str, asset_type: AssetType, first: &AssetUnit) -> AssetUnit {
    let name = key.strip_suffix(&format!(".{}", asset_type.extension())).unwrap_or(key);
    let hash = key.strip_prefix(AGGREGATE_KEY_PREFIX).unwrap_or(key);
    let version: String = hash.chars().take(CONTENT_HASH_LENGTH).collect();

    AssetUnit {
        name: name.to_string(),
        version,
        asset_type: Some(asset_type),
        dom_position: first.resolved_dom_position(),
        locations: BTreeMap::from([(AGGREGATE_LOCATION.to_string(), location.to_string())]),
        condition: None,
        processors: None,
        bundle_name: None,
        vendor: false,
        generator_uid: None,
        attributes: BTreeMap::new(),
    }
}
