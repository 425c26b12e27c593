//! Unbounded in-memory content store.

use dashmap::DashMap;
use std::sync::Arc;

use super::{ContentStore, StorageEntry, StoreCounters, StoreStats};

/// Unbounded store backed by a concurrent hash map.
///
/// This is the default store. Entries live until removed or cleared.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    entries: DashMap<String, Arc<StorageEntry>>,
    counters: StoreCounters,
}

impl MemoryContentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemoryContentStore {
    fn get(&self, key: &str) -> Option<Arc<StorageEntry>> {
        let found = self.entries.get(key).map(|entry| Arc::clone(entry.value()));
        self.counters.record_get(found.is_some());
        found
    }

    fn put(&self, key: String, entry: Arc<StorageEntry>) {
        self.counters.record_put();
        self.entries.insert(key, entry);
    }

    fn remove(&self, key: &str) -> Option<Arc<StorageEntry>> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Vec<(String, Arc<StorageEntry>)> {
        let mut entries: Vec<_> =
            self.entries.iter().map(|e| (e.key().clone(), Arc::clone(e.value()))).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn stats(&self) -> StoreStats {
        self.counters.snapshot()
    }
}
