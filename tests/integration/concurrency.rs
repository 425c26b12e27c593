use std::sync::Arc;
use std::thread;

use abm_cli::config::EngineConfig;
use abm_cli::core::{AssetUnit, BundleUnit};
use abm_cli::storage::{BoundedContentStore, ContentStore, MemoryContentStore, StorageEntry};
use abm_cli::test_utils::memory_engine;

#[test]
fn test_parallel_requests_share_entries() {
    let files: Vec<(String, String)> = (0..8).map(|i| (format!("m{i}.js"), format!("var m{i};"))).collect();
    let file_refs: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), c.as_str())).collect();

    let mut engine = memory_engine(&file_refs, EngineConfig::default(), Vec::new()).unwrap();
    let mut bundle = BundleUnit::new("app");
    for (name, _) in &files {
        bundle = bundle.with_asset(AssetUnit::new(name.trim_end_matches(".js"), "1").with_location("memory", name));
    }
    engine.load(vec![bundle]).unwrap();
    let engine = Arc::new(engine);

    let keys: Vec<Vec<String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                scope.spawn(move || {
                    let mut seen = Vec::new();
                    for _ in 0..20 {
                        let outcome = engine.process(&["app"], &engine.request("/index.html"));
                        assert!(outcome.warnings.is_empty());
                        seen.extend(outcome.storage_keys().into_iter().map(str::to_string));
                    }
                    seen
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = &keys[0][0];
    assert!(keys.iter().flatten().all(|key| key == first));

    let entry = engine.entry(first).unwrap();
    let expected: String = (0..8).map(|i| format!("var m{i};\n")).collect();
    assert_eq!(entry.content(), expected.as_bytes());
}

fn hammer(store: &dyn ContentStore) {
    let asset = Arc::new(AssetUnit::new("a", "1").with_location("memory", "a.js"));
    thread::scope(|scope| {
        for t in 0..4 {
            let asset = Arc::clone(&asset);
            scope.spawn(move || {
                for i in 0..50 {
                    let key = format!("k{}", (t * 50 + i) % 60);
                    store.put(
                        key.clone(),
                        Arc::new(StorageEntry::Single {
                            asset: Arc::clone(&asset),
                            content: key.clone().into_bytes(),
                        }),
                    );
                    if let Some(entry) = store.get(&key) {
                        assert_eq!(entry.content(), key.as_bytes());
                    }
                }
            });
        }
    });
}

#[test]
fn test_memory_store_under_contention() {
    let store = MemoryContentStore::new();
    hammer(&store);

    let stats = store.stats();
    assert_eq!(stats.puts, 200);
    assert_eq!(stats.gets, 200);
    assert_eq!(stats.hits, 200);
    assert_eq!(store.len(), 60);
}

#[test]
fn test_bounded_store_under_contention() {
    let store = BoundedContentStore::new(16);
    hammer(&store);

    assert_eq!(store.stats().puts, 200);
    assert!(store.len() <= 16);
}
