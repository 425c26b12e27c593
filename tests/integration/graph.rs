use abm_cli::core::{AbmError, AssetUnit, BundleUnit};
use abm_cli::resolver::BundleStore;

fn bundle(name: &str, deps: &[&str]) -> BundleUnit {
    let mut unit = BundleUnit::new(name)
        .with_asset(AssetUnit::new(name, "1").with_location("webapp", format!("/js/{name}.js")));
    for dep in deps {
        unit = unit.with_dependency(*dep);
    }
    unit
}

fn names(store: &BundleStore, roots: &[&str]) -> Vec<String> {
    store.resolve(roots).into_iter().map(|b| b.name).collect()
}

#[test]
fn test_cycle_rejected_with_path() {
    let mut store = BundleStore::new();
    store.load(vec![bundle("A", &["B"]), bundle("B", &["C"])]).unwrap();

    let err = store.load(vec![bundle("C", &["A"])]).unwrap_err();
    match err {
        AbmError::CircularDependency { path, .. } => {
            assert_eq!(path.first(), path.last());
            assert_eq!(path.len(), 4);
            for name in ["A", "B", "C"] {
                assert!(path.iter().any(|p| p == name), "{name} missing from {path:?}");
            }
        }
        other => panic!("expected cycle, got {other:?}"),
    }

    // the failed load left the graph untouched
    assert_eq!(store.graph().edge_count(), 2);
    assert!(!store.graph().get("C").is_some_and(|c| c.is_defined()));
    assert_eq!(names(&store, &["A"]), vec!["C", "B", "A"]);
}

#[test]
fn test_diamond_order() {
    let mut store = BundleStore::new();
    store
        .load(vec![bundle("D", &["B", "C"]), bundle("B", &["A"]), bundle("C", &["A"]), bundle("A", &[])])
        .unwrap();

    let order = names(&store, &["D"]);
    assert_eq!(order.len(), 4);
    let pos = |n: &str| order.iter().position(|o| o == n).unwrap();
    assert!(pos("A") < pos("B"));
    assert!(pos("A") < pos("C"));
    assert_eq!(pos("D"), 3);
}

#[test]
fn test_leaf_and_unknown() {
    let mut store = BundleStore::new();
    store.load(vec![bundle("solo", &[])]).unwrap();

    assert_eq!(names(&store, &["solo"]), vec!["solo"]);
    assert!(names(&store, &["missing"]).is_empty());
    assert_eq!(store.suggest("slo"), vec!["solo"]);
}

#[test]
fn test_case_insensitive_names() {
    let mut store = BundleStore::new();
    store.load(vec![bundle("JQuery", &[]), bundle("app", &["jquery"])]).unwrap();

    assert_eq!(names(&store, &["APP"]), vec!["JQuery", "app"]);
    assert_eq!(store.graph().len(), 2);
}

#[test]
fn test_multiple_roots_share_dependencies() {
    let mut store = BundleStore::new();
    store.load(vec![bundle("base", &[]), bundle("x", &["base"]), bundle("y", &["base"])]).unwrap();

    let order = names(&store, &["x", "y"]);
    assert_eq!(order, vec!["base", "x", "y"]);
}

#[test]
fn test_tree_marks_repeats_and_placeholders() {
    let mut store = BundleStore::new();
    store.load(vec![bundle("app", &["lib", "widgets"]), bundle("widgets", &["lib", "ghost"]), bundle("lib", &[])]).unwrap();

    let tree = store.graph().to_tree_string("app").unwrap();
    let expected = "\
app
├── lib
└── widgets
    ├── lib (shown above)
    └── ghost (undefined)
";
    assert_eq!(tree, expected);

    let report = store.validate("ghost").unwrap();
    assert_eq!(report.reasons, vec!["missing bundle definition"]);
}
