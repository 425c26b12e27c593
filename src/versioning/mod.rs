//! Versioning strategies.
//!
//! The effective version of an asset is part of its storage key and of the
//! URL it is served under. Which version is used is decided by a
//! [`VersioningStrategy`] selected by name from configuration:
//!
//! | Name           | Version                                         |
//! |----------------|-------------------------------------------------|
//! | `asset`        | The version declared on the asset (default)     |
//! | `fixed`        | One configured string for every asset           |
//! | `content-hash` | First 12 hex chars of the SHA-256 of the content |
//!
//! Strategies are registered once in a [`VersioningRegistry`] when the engine
//! is built; custom strategies can be added next to the built-in ones.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::CONTENT_HASH_LENGTH;
use crate::core::{AbmError, AssetUnit};

/// Computes the effective version of an asset.
pub trait VersioningStrategy: Send + Sync {
    /// Name used to select the strategy in configuration.
    fn name(&self) -> &str;

    /// Version for `asset`, given its raw content.
    fn compute_version(&self, asset: &AssetUnit, content: &[u8]) -> String;
}

/// Uses the version declared on the asset.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetVersioning;

impl VersioningStrategy for AssetVersioning {
    fn name(&self) -> &str {
        "asset"
    }

    fn compute_version(&self, asset: &AssetUnit, _content: &[u8]) -> String {
        asset.version.clone()
    }
}

/// Uses the same configured version for every asset.
#[derive(Debug, Clone)]
pub struct FixedVersioning {
    version: String,
}

impl FixedVersioning {
    /// Create a strategy returning `version` for every asset.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl VersioningStrategy for FixedVersioning {
    fn name(&self) -> &str {
        "fixed"
    }

    fn compute_version(&self, _asset: &AssetUnit, _content: &[u8]) -> String {
        self.version.clone()
    }
}

/// Derives the version from the content, so any change busts caches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHashVersioning;

impl VersioningStrategy for ContentHashVersioning {
    fn name(&self) -> &str {
        "content-hash"
    }

    fn compute_version(&self, _asset: &AssetUnit, content: &[u8]) -> String {
        let mut hex = hex::encode(Sha256::digest(content));
        hex.truncate(CONTENT_HASH_LENGTH);
        hex
    }
}

/// Named collection of versioning strategies.
#[derive(Clone, Default)]
pub struct VersioningRegistry {
    strategies: HashMap<String, Arc<dyn VersioningStrategy>>,
}

impl std::fmt::Debug for VersioningRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.strategies.keys().collect();
        names.sort();
        f.debug_struct("VersioningRegistry").field("strategies", &names).finish()
    }
}

impl VersioningRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in strategies; `fixed` returns
    /// `fixed_version`.
    #[must_use]
    pub fn with_defaults(fixed_version: &str) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AssetVersioning));
        registry.register(Arc::new(FixedVersioning::new(fixed_version)));
        registry.register(Arc::new(ContentHashVersioning));
        registry
    }

    /// Add a strategy, replacing one with the same name.
    pub fn register(&mut self, strategy: Arc<dyn VersioningStrategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    /// Select a strategy by name.
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::UnknownVersioningStrategy`] for unregistered names.
    pub fn get(&self, name: &str) -> Result<Arc<dyn VersioningStrategy>, AbmError> {
        self.strategies.get(name).cloned().ok_or_else(|| AbmError::UnknownVersioningStrategy {
            name: name.to_string(),
        })
    }
}
