//! Content storage for processed assets.
//!
//! The pipeline writes every processed asset, minified asset and aggregate
//! into a [`ContentStore`] under a key derived in [`key`]. A serving layer
//! later reads entries back by key.
//!
//! # Implementations
//!
//! - [`MemoryContentStore`] - Unbounded, backed by a `DashMap`
//! - [`BoundedContentStore`] - Size-bounded with eviction, backed by `moka`
//!
//! Both keep the same [`StoreStats`] counters and are safe to share across
//! threads behind an `Arc`.
//!
//! # Lifecycle of an entry
//!
//! An entry is created the first time a key is processed and is never changed
//! afterwards: processing the same key again is a cache hit. Entries disappear
//! only through [`ContentStore::remove`], [`ContentStore::clear`] or, for the
//! bounded store, eviction. Two concurrent requests may both miss and write the
//! same key; the values are identical, so the last write simply wins.

pub mod bounded;
pub mod key;
pub mod memory;
pub mod stats;

pub use bounded::BoundedContentStore;
pub use memory::MemoryContentStore;
pub use stats::{StoreCounters, StoreStats};

use std::sync::Arc;

use crate::core::AssetUnit;

/// One stored piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEntry {
    /// Content of one asset
    Single {
        /// The asset the content belongs to
        asset: Arc<AssetUnit>,
        /// Processed bytes
        content: Vec<u8>,
    },
    /// Concatenated content of several assets of the same type
    Aggregate {
        /// Synthetic asset standing for the aggregate
        asset: Arc<AssetUnit>,
        /// Constituent assets in concatenation order
        constituents: Vec<Arc<AssetUnit>>,
        /// Concatenated bytes
        content: Vec<u8>,
    },
}

impl StorageEntry {
    /// Stored bytes.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        match self {
            Self::Single { content, .. } | Self::Aggregate { content, .. } => content,
        }
    }

    /// The asset this entry is served as.
    #[must_use]
    pub const fn asset(&self) -> &Arc<AssetUnit> {
        match self {
            Self::Single { asset, .. } | Self::Aggregate { asset, .. } => asset,
        }
    }

    /// Whether the entry is an aggregate.
    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate { .. })
    }
}

/// Key-value store for processed content.
///
/// `get` and `put` update the store's counters; the other operations do not.
pub trait ContentStore: Send + Sync + std::fmt::Debug {
    /// Look up an entry, counting a hit or a miss.
    fn get(&self, key: &str) -> Option<Arc<StorageEntry>>;

    /// Store an entry, replacing any previous value.
    fn put(&self, key: String, entry: Arc<StorageEntry>);

    /// Remove an entry, returning it if present.
    fn remove(&self, key: &str) -> Option<Arc<StorageEntry>>;

    /// Remove every entry. Counters are kept.
    fn clear(&self);

    /// Whether an entry exists, without touching the counters.
    fn contains(&self, key: &str) -> bool;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entries, sorted by key.
    fn entries(&self) -> Vec<(String, Arc<StorageEntry>)>;

    /// Snapshot of the counters.
    fn stats(&self) -> StoreStats;
}

/// Create the store matching a configured capacity.
///
/// `0` selects the unbounded [`MemoryContentStore`].
#[must_use]
pub fn content_store_with_capacity(max_entries: u64) -> Arc<dyn ContentStore> {
    if max_entries == 0 {
        Arc::new(MemoryContentStore::new())
    } else {
        Arc::new(BoundedContentStore::new(max_entries))
    }
}
