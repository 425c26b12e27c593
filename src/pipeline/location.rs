//! Location resolution, the first stage of every asset's pipeline.
//!
//! An asset declares candidate locations keyed by locator name. Resolution
//! picks exactly one of them:
//!
//! 1. An asset with a single location always uses it, whatever the strategy.
//! 2. Otherwise the first key of the resolution strategy for which the asset
//!    has a non-blank location wins.
//! 3. If no key matches, the asset cannot be served and is dropped from the
//!    request with a [`LocationUnresolved`](crate::core::AbmError::LocationUnresolved)
//!    warning.
//!
//! The chosen `(key, raw location)` pair is then handed to the [`Locator`]
//! registered for the key, which turns the raw location into the final URL and
//! fetches the content on demand.
//!
//! Resolution behaves like a processor of rank 0: it always runs before any
//! [`Processor`](super::Processor).

use std::collections::HashMap;
use std::sync::Arc;

use super::RequestContext;
use crate::core::AssetUnit;

/// Pick the location of `asset` to use under `strategy`.
///
/// Returns the `(location key, raw location)` pair, or `None` when nothing
/// matches.
///
/// ```rust
/// use abm_cli::core::AssetUnit;
/// use abm_cli::pipeline::select_location;
///
/// let asset = AssetUnit::new("a", "1")
///     .with_location("webapp", "/a.js")
///     .with_location("cdn", "http://x/a.js");
///
/// let cdn_first = vec!["cdn".to_string(), "webapp".to_string()];
/// assert_eq!(select_location(&asset, &cdn_first), Some(("cdn", "http://x/a.js")));
/// ```
#[must_use]
pub fn select_location<'a>(asset: &'a AssetUnit, strategy: &[String]) -> Option<(&'a str, &'a str)> {
    if asset.locations.len() == 1 {
        return asset.locations.iter().next().map(|(k, v)| (k.as_str(), v.as_str()));
    }

    strategy.iter().find_map(|key| {
        asset
            .locations
            .get_key_value(key.as_str())
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    })
}

/// Turns a raw location into a final URL and reads its content.
pub trait Locator: Send + Sync {
    /// Location key this locator handles (`webapp`, `file`, `cdn`, ...).
    fn key(&self) -> &str;

    /// Final URL of the asset for this request.
    fn resolve(&self, asset: &AssetUnit, raw: &str, request: &RequestContext) -> String;

    /// Raw bytes of the asset.
    ///
    /// # Errors
    ///
    /// Any error is reported as a content fetch failure for this asset only.
    fn fetch_content(&self, asset: &AssetUnit, raw: &str, request: &RequestContext) -> anyhow::Result<Vec<u8>>;

    /// Whether assets from this locator must go through the store even when
    /// the locator is remote.
    fn is_caching_forced(&self) -> bool {
        false
    }

    /// Whether the location points outside this application. Remote assets
    /// are referenced by URL and not processed unless caching is forced.
    fn is_remote(&self) -> bool {
        false
    }
}

/// Locators indexed by location key.
#[derive(Clone, Default)]
pub struct LocatorRegistry {
    locators: HashMap<String, Arc<dyn Locator>>,
}

impl std::fmt::Debug for LocatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.locators.keys().collect();
        keys.sort();
        f.debug_struct("LocatorRegistry").field("locators", &keys).finish()
    }
}

impl LocatorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a locator, replacing one with the same key.
    pub fn register(&mut self, locator: Arc<dyn Locator>) {
        self.locators.insert(locator.key().to_string(), locator);
    }

    /// Locator for a location key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<dyn Locator>> {
        self.locators.get(key).cloned()
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.locators.keys().cloned().collect();
        keys.sort();
        keys
    }
}
