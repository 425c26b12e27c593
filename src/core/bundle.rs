//! Bundle definitions
//!
//! A bundle is a named, ordered collection of assets plus the names of the
//! bundles it depends on. Bundles are produced by [loaders](crate::loader) and
//! consolidated into the [`BundleGraph`](crate::resolver::BundleGraph) by the
//! [`BundleStore`](crate::resolver::BundleStore).
//!
//! Bundle names are unique across the graph and compared case-insensitively.
//! Dependencies may name bundles that have not been loaded yet; such names
//! become placeholder vertices until a later loader defines them.

use crate::core::AssetUnit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// A bundle declaration as produced by a loader
///
/// The JSON form accepts either `bundle` or `name` for the bundle name:
///
/// ```json
/// {
///   "bundle": "app",
///   "dependencies": ["jquery"],
///   "assets": [
///     { "name": "app", "version": "1.0", "locations": { "webapp": "/js/app.js" } }
///   ]
/// }
/// ```
///
/// Assets are shared through [`Arc`] so resolved bundles and storage entries
/// can hold them without copying; consolidation uses [`Arc::make_mut`] to edit
/// them in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleUnit {
    /// Bundle name
    #[serde(rename = "bundle", alias = "name")]
    pub name: String,

    /// Names of the bundles this bundle depends on, in declared order
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Assets declared by this bundle
    #[serde(default)]
    pub assets: Vec<Arc<AssetUnit>>,

    /// Name of the loader that produced the bundle
    #[serde(skip)]
    pub origin: Option<String>,

    /// Whether the bundle was produced by a vendor loader
    #[serde(default)]
    pub vendor: bool,

    /// Definition file the bundle was read from, relative to the loader root
    #[serde(skip)]
    pub relative_path: Option<PathBuf>,
}

impl BundleUnit {
    /// Create an empty bundle.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            assets: Vec::new(),
            origin: None,
            vendor: false,
            relative_path: None,
        }
    }

    /// Add a dependency by name.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Add an asset.
    #[must_use]
    pub fn with_asset(mut self, asset: AssetUnit) -> Self {
        self.assets.push(Arc::new(asset));
        self
    }

    /// Mark the bundle as vendor-provided.
    #[must_use]
    pub const fn vendor(mut self, vendor: bool) -> Self {
        self.vendor = vendor;
        self
    }

    /// Normalized lookup key (trimmed, lowercase).
    #[must_use]
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether the bundle was defined by a loader, as opposed to a
    /// placeholder created for a dependency that was never loaded.
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        self.origin.is_some()
    }
}

/// Normalize a bundle name for case-insensitive lookups.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A bundle as returned by a resolution query
///
/// A snapshot of the bundle's assets at resolution time; later loads do not
/// affect an already resolved bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBundle {
    /// Bundle name as declared
    pub name: String,
    /// Whether the bundle is vendor-provided
    pub vendor: bool,
    /// Loader that defined the bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Assets in declared order
    pub assets: Vec<Arc<AssetUnit>>,
}

impl From<&BundleUnit> for ResolvedBundle {
    fn from(unit: &BundleUnit) -> Self {
        Self {
            name: unit.name.clone(),
            vendor: unit.vendor,
            origin: unit.origin.clone(),
            assets: unit.assets.clone(),
        }
    }
}
