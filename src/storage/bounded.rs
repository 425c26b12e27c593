//! Size-bounded content store.

use moka::sync::Cache;
use std::sync::Arc;

use super::{ContentStore, StorageEntry, StoreCounters, StoreStats};

/// Store that keeps at most `max_entries` entries, evicting the least
/// valuable ones first.
///
/// Eviction is performed by `moka` in the background of regular operations;
/// `len` and `entries` flush pending maintenance first so they report a
/// settled view.
#[derive(Debug)]
pub struct BoundedContentStore {
    cache: Cache<String, Arc<StorageEntry>>,
    counters: StoreCounters,
    max_entries: u64,
}

impl BoundedContentStore {
    /// Create a store holding at most `max_entries` entries.
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
            counters: StoreCounters::default(),
            max_entries,
        }
    }

    /// Configured capacity.
    #[must_use]
    pub const fn max_entries(&self) -> u64 {
        self.max_entries
    }
}

impl ContentStore for BoundedContentStore {
    fn get(&self, key: &str) -> Option<Arc<StorageEntry>> {
        let found = self.cache.get(key);
        self.counters.record_get(found.is_some());
        found
    }

    fn put(&self, key: String, entry: Arc<StorageEntry>) {
        self.counters.record_put();
        self.cache.insert(key, entry);
    }

    fn remove(&self, key: &str) -> Option<Arc<StorageEntry>> {
        self.cache.remove(key)
    }

    fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        usize::try_from(self.cache.entry_count()).unwrap_or(usize::MAX)
    }

    fn entries(&self) -> Vec<(String, Arc<StorageEntry>)> {
        self.cache.run_pending_tasks();
        let mut entries: Vec<_> = self.cache.iter().map(|(k, v)| (k.as_ref().clone(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn stats(&self) -> StoreStats {
        self.counters.snapshot()
    }
}
