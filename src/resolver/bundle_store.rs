//! Consolidation of loaded bundles and resolution queries.
//!
//! The [`BundleStore`] is the single owner of the [`BundleGraph`]. Loaders hand
//! it batches of [`BundleUnit`]s; the store merges them into the graph and
//! answers "which bundles, in which order" for a request.
//!
//! # Asset consolidation
//!
//! Asset identity is global, not per bundle. When a bundle declares an asset
//! whose name (ignoring case) and type match an asset already present
//! *anywhere* in the graph, the existing asset is updated in place instead of
//! a second copy being added. The asset stays in the bundle that declared it
//! first, but its `bundle_name` points at the last writer:
//!
//! ```rust
//! use abm_cli::core::{AssetUnit, BundleUnit};
//! use abm_cli::resolver::BundleStore;
//!
//! let mut store = BundleStore::new();
//! store.load(vec![
//!     BundleUnit::new("X").with_asset(AssetUnit::new("foo", "v1").with_location("webapp", "/foo.js")),
//!     BundleUnit::new("Y").with_asset(AssetUnit::new("foo", "v2").with_location("webapp", "/foo.js")),
//! ]).unwrap();
//!
//! let assets = store.resolve_assets(&["X", "Y"]);
//! assert_eq!(assets.len(), 1);
//! assert_eq!(assets[0].version, "v2");
//! assert_eq!(assets[0].bundle_name.as_deref(), Some("Y"));
//! ```
//!
//! Loaders that must win such overrides therefore have to be loaded last; see
//! [`load_all`](crate::loader::load_all).
//!
//! # Atomic loads
//!
//! A [`load`](BundleStore::load) call is staged on a copy of the graph and only
//! committed when every unit was merged. A cycle anywhere in the batch leaves
//! the store exactly as it was before the call.

use std::sync::Arc;
use strsim::levenshtein;

use super::dependency_graph::BundleGraph;
use super::validation::{ValidationReport, validate_bundle};
use crate::constants::{DIRECT_ORIGIN, MAX_SUGGESTIONS, SIMILARITY_THRESHOLD_PERCENT};
use crate::core::{AbmError, AssetUnit, BundleUnit, ResolvedBundle};

/// Owner of the bundle graph.
#[derive(Debug, Clone, Default)]
pub struct BundleStore {
    graph: BundleGraph,
}

impl BundleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the underlying graph.
    #[must_use]
    pub const fn graph(&self) -> &BundleGraph {
        &self.graph
    }

    /// Consolidate a batch of bundles into the graph.
    ///
    /// Units are applied in order. For each unit the vertex is created or
    /// updated, its assets are merged and its dependency edges are added.
    /// Dependencies on unknown bundles create placeholder vertices.
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::CircularDependency`] when any declared dependency
    /// closes a cycle. Nothing from the batch is kept in that case.
    pub fn load(&mut self, units: Vec<BundleUnit>) -> Result<(), AbmError> {
        let mut staged = self.graph.clone();
        let count = units.len();

        for unit in units {
            Self::merge_unit(&mut staged, unit)?;
        }

        self.graph = staged;
        tracing::info!(
            "Loaded {} bundle definition(s); graph has {} bundle(s) and {} edge(s)",
            count,
            self.graph.len(),
            self.graph.edge_count()
        );
        Ok(())
    }

    fn merge_unit(graph: &mut BundleGraph, unit: BundleUnit) -> Result<(), AbmError> {
        let name = unit.name.trim().to_string();
        graph.add_vertex(&name);

        if let Some(vertex) = graph.get_mut(&name) {
            vertex.name.clone_from(&name);
            vertex.origin = Some(unit.origin.clone().unwrap_or_else(|| DIRECT_ORIGIN.to_string()));
            vertex.vendor = unit.vendor;
            vertex.relative_path.clone_from(&unit.relative_path);
        }

        for asset in &unit.assets {
            let mut incoming = AssetUnit::clone(asset);
            incoming.finalize();
            incoming.vendor |= unit.vendor;

            if let Some(existing) = graph.find_asset_mut(&incoming) {
                tracing::debug!(
                    "Asset '{}' redeclared by bundle '{}', overriding in place",
                    incoming.key(),
                    name
                );
                Arc::make_mut(existing).merge_from(&incoming, &name);
            } else if let Some(vertex) = graph.get_mut(&name) {
                incoming.bundle_name = Some(name.clone());
                vertex.assets.push(Arc::new(incoming));
            }
        }

        for dependency in &unit.dependencies {
            if dependency.trim().is_empty() {
                tracing::warn!("Bundle '{}' declares an empty dependency name, ignoring it", name);
                continue;
            }
            graph.add_edge(&name, dependency)?;
        }

        Ok(())
    }

    /// Bundles needed for a request, dependencies first.
    ///
    /// Unknown names are skipped with a warning that suggests close matches.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Vec<ResolvedBundle> {
        for name in names {
            let name = name.as_ref();
            if !self.graph.contains(name) {
                match self.suggest(name).as_slice() {
                    [] => tracing::warn!("Bundle '{}' not found", name),
                    suggestions => tracing::warn!(
                        "Bundle '{}' not found. Did you mean: {}?",
                        name,
                        suggestions.join(", ")
                    ),
                }
            }
        }

        self.graph
            .topological_order_all(names)
            .iter()
            .filter_map(|name| self.graph.get(name))
            .inspect(|bundle| {
                if !bundle.is_defined() {
                    tracing::warn!("Bundle '{}' is referenced but was never defined", bundle.name);
                }
            })
            .map(ResolvedBundle::from)
            .collect()
    }

    /// Flattened asset list for a request, in bundle then declaration order.
    #[must_use]
    pub fn resolve_assets<S: AsRef<str>>(&self, names: &[S]) -> Vec<Arc<AssetUnit>> {
        self.resolve(names).into_iter().flat_map(|bundle| bundle.assets).collect()
    }

    /// Validate one bundle; `None` when the bundle is unknown.
    #[must_use]
    pub fn validate(&self, name: &str) -> Option<ValidationReport> {
        self.graph.get(name).map(validate_bundle)
    }

    /// Validate every bundle, returning one error per invalid bundle.
    #[must_use]
    pub fn validate_all(&self) -> Vec<AbmError> {
        self.graph.bundles().filter_map(|bundle| validate_bundle(bundle).into_error()).collect()
    }

    /// Close matches for an unknown bundle name.
    #[must_use]
    pub fn suggest(&self, name: &str) -> Vec<String> {
        let target = name.to_lowercase();
        let mut scored: Vec<_> = self
            .graph
            .bundles()
            .filter(|bundle| bundle.is_defined())
            .map(|bundle| (bundle.name.clone(), levenshtein(&target, &bundle.name.to_lowercase())))
            .collect();

        scored.sort_by_key(|(_, dist)| *dist);

        scored
            .into_iter()
            .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(MAX_SUGGESTIONS)
            .map(|(name, _)| name)
            .collect()
    }
}
