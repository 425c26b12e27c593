//! Bundle graph construction and resolution.
//!
//! - [`dependency_graph`] - [`BundleGraph`], the acyclic graph of bundles with
//!   incremental cycle detection and topological ordering
//! - [`bundle_store`] - [`BundleStore`], which consolidates loaded bundles into
//!   the graph and answers resolution queries
//! - [`validation`] - Accumulating bundle validation
//!
//! # Resolution order
//!
//! For a request naming several bundles, the result lists every bundle needed
//! exactly once, with each bundle after all of its dependencies. Among
//! independent bundles, declaration order decides: roots are processed in the
//! order requested and dependencies in the order declared.

pub mod bundle_store;
pub mod dependency_graph;
pub mod validation;

pub use bundle_store::BundleStore;
pub use dependency_graph::BundleGraph;
pub use validation::{ValidationReport, validate_bundle};
