//! Bundle loaders.
//!
//! A [`Loader`] produces [`BundleUnit`]s from some source: a directory of JSON
//! definitions ([`JsonBundleLoader`]) or a list built in code
//! ([`StaticLoader`]).
//!
//! # Precedence
//!
//! Because the [`BundleStore`] lets a later declaration of an asset override an
//! earlier one, load order matters. [`load_all`] always loads by
//! [`LoaderKind`]: vendor loaders first, then user loaders, then core loaders.
//! Loaders of the same kind keep the order they were given in.

pub mod json;
pub mod static_loader;

pub use json::JsonBundleLoader;
pub use static_loader::StaticLoader;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;

use crate::core::BundleUnit;
use crate::resolver::BundleStore;

/// Category of a loader; decides load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    /// Third-party bundles, loaded first
    Vendor,
    /// Application bundles
    User,
    /// Bundles shipped with the engine, loaded last
    Core,
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vendor => f.write_str("vendor"),
            Self::User => f.write_str("user"),
            Self::Core => f.write_str("core"),
        }
    }
}

/// Source of bundle definitions.
pub trait Loader: Send + Sync {
    /// Name recorded as the origin of every bundle the loader produces.
    fn name(&self) -> &str;

    /// Category of the loader.
    fn kind(&self) -> LoaderKind;

    /// Read all bundle definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or a definition is
    /// malformed.
    fn load(&self) -> Result<Vec<BundleUnit>>;
}

/// Summary of a [`load_all`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// `(loader name, bundles loaded)` in load order
    pub loaders: Vec<(String, usize)>,
}

impl LoadSummary {
    /// Total number of bundle definitions loaded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.loaders.iter().map(|(_, count)| count).sum()
    }
}

/// Run every loader in precedence order and consolidate into `store`.
///
/// Each bundle is stamped with its loader's name as origin; bundles from
/// vendor loaders are marked as vendor bundles.
///
/// # Errors
///
/// Returns the first loader failure or consolidation error. Loaders that ran
/// before the failure stay loaded.
pub fn load_all(store: &mut BundleStore, loaders: &[&dyn Loader]) -> Result<LoadSummary> {
    let mut ordered: Vec<&dyn Loader> = loaders.to_vec();
    ordered.sort_by_key(|loader| loader.kind());

    let mut summary = LoadSummary::default();
    for loader in ordered {
        let mut units = loader.load().with_context(|| format!("Loader '{}' failed", loader.name()))?;

        for unit in &mut units {
            unit.origin = Some(loader.name().to_string());
            unit.vendor |= loader.kind() == LoaderKind::Vendor;
        }

        let count = units.len();
        tracing::debug!("Loader '{}' ({}) produced {} bundle(s)", loader.name(), loader.kind(), count);
        store.load(units).with_context(|| format!("Failed to consolidate bundles from '{}'", loader.name()))?;
        summary.loaders.push((loader.name().to_string(), count));
    }

    Ok(summary)
}
