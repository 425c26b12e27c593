use abm_cli::core::{AbmError, AssetType, AssetUnit, BundleUnit, DomPosition};
use abm_cli::loader::{JsonBundleLoader, LoaderKind, StaticLoader, load_all};
use abm_cli::resolver::BundleStore;
use abm_cli::test_utils::BundleDir;

#[test]
fn test_merge_override_across_bundles() {
    let mut store = BundleStore::new();
    store
        .load(vec![
            BundleUnit::new("X").with_asset(AssetUnit::new("foo", "v1").with_location("webapp", "/foo.js")),
            BundleUnit::new("Y").with_asset(AssetUnit::new("foo", "v2").with_location("webapp", "/foo.js")),
        ])
        .unwrap();

    let assets = store.resolve_assets(&["X", "Y"]);
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].key(), "foo.js");
    assert_eq!(assets[0].version, "v2");
    assert_eq!(assets[0].bundle_name.as_deref(), Some("Y"));
    assert!(store.resolve_assets(&["Y"]).is_empty());
}

#[test]
fn test_merge_keeps_derived_type() {
    let mut store = BundleStore::new();
    store
        .load(vec![
            BundleUnit::new("X").with_asset(AssetUnit::new("foo", "v1").with_location("webapp", "/foo.js")),
            BundleUnit::new("Y").with_asset(
                AssetUnit::new("foo", "v2").with_type(AssetType::Js).with_location("webapp", "/foo.mjs"),
            ),
        ])
        .unwrap();

    let assets = store.resolve_assets(&["X"]);
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].resolved_type(), Some(AssetType::Js));
    assert_eq!(assets[0].key(), "foo.js");
    assert_eq!(assets[0].locations.get("webapp").map(String::as_str), Some("/foo.mjs"));
    assert!(store.validate("X").unwrap().reasons.is_empty());
}

#[test]
fn test_merge_replaces_fields_but_keeps_processors() {
    let mut store = BundleStore::new();
    store
        .load(vec![
            BundleUnit::new("base").with_asset(
                AssetUnit::new("theme", "1")
                    .with_location("webapp", "/theme.css")
                    .with_processors(["css-min"])
                    .with_attribute("media", "screen"),
            ),
        ])
        .unwrap();
    store
        .load(vec![
            BundleUnit::new("skin").with_asset(
                AssetUnit::new("theme", "2")
                    .with_location("cdn", "https://cdn.example.com/theme.css")
                    .with_attribute("title", "dark"),
            ),
        ])
        .unwrap();

    let assets = store.resolve_assets(&["base"]);
    let theme = &assets[0];
    assert_eq!(theme.version, "2");
    assert_eq!(theme.processors.as_deref(), Some(&["css-min".to_string()][..]));
    assert_eq!(theme.locations.keys().collect::<Vec<_>>(), vec!["cdn"]);
    assert_eq!(theme.attributes.get("media"), None);
    assert_eq!(theme.attributes.get("title").map(String::as_str), Some("dark"));
    assert_eq!(theme.bundle_name.as_deref(), Some("skin"));
}

#[test]
fn test_json_definitions() {
    let dir = BundleDir::new().unwrap();
    dir.write(
        "jquery.json",
        r#"{
            "bundle": "jquery",
            "assets": [ { "name": "jquery", "version": "3.7.1", "locations": {
                "webapp": "/js/jquery.js", "cdn": "https://code.jquery.com/jquery-3.7.1.min.js" } } ]
        }"#,
    )
    .unwrap();
    dir.write(
        "app/app.json",
        r#"[
            { "bundle": "app", "dependencies": ["jquery"], "assets": [
                { "version": "1.0", "locations": { "webapp": "/js/app.js" } },
                { "name": "app", "version": "1.0", "type": "css", "dom": "body",
                  "locations": { "webapp": "/styles/app" }, "condition": "lt IE 9" } ] }
        ]"#,
    )
    .unwrap();

    let loader = JsonBundleLoader::new("site", LoaderKind::User, dir.bundles_path());
    let mut store = BundleStore::new();
    let summary = load_all(&mut store, &[&loader]).unwrap();
    assert_eq!(summary.total(), 2);

    let bundles = store.resolve(&["app"]);
    assert_eq!(bundles.len(), 2);
    assert_eq!(bundles[0].name, "jquery");
    assert_eq!(bundles[0].origin.as_deref(), Some("site"));

    let app = &bundles[1].assets;
    assert_eq!(app[0].name, "app");
    assert_eq!(app[0].key(), "app.js");
    assert_eq!(app[1].resolved_type(), Some(AssetType::Css));
    assert_eq!(app[1].resolved_dom_position(), Some(DomPosition::Body));
    assert_eq!(app[1].condition.as_deref(), Some("lt IE 9"));

    let unit = store.graph().get("app").unwrap();
    assert_eq!(unit.relative_path.as_deref(), Some(std::path::Path::new("app/app.json")));
    assert!(store.validate_all().is_empty());
}

#[test]
fn test_vendor_loaded_before_user() {
    let dir = BundleDir::new().unwrap();
    dir.write(
        "override.json",
        r#"{ "bundle": "site", "assets": [
            { "name": "jquery", "version": "patched", "locations": { "webapp": "/js/jquery.js" } } ] }"#,
    )
    .unwrap();

    let vendor = StaticLoader::new(
        "vendor",
        LoaderKind::Vendor,
        vec![BundleUnit::new("jquery").with_asset(AssetUnit::new("jquery", "3.7.1").with_location("webapp", "/js/jquery.js"))],
    );
    let user = JsonBundleLoader::new("user", LoaderKind::User, dir.bundles_path());

    // given out of order on purpose
    let mut store = BundleStore::new();
    load_all(&mut store, &[&user, &vendor]).unwrap();

    let assets = store.resolve_assets(&["jquery"]);
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].version, "patched");
    assert!(!assets[0].vendor);
    assert!(store.graph().get("jquery").unwrap().vendor);
    assert!(!store.graph().get("site").unwrap().vendor);
}

#[test]
fn test_invalid_definitions_reported_together() {
    let dir = BundleDir::new().unwrap();
    dir.write(
        "broken.json",
        r#"[
            { "bundle": "empty" },
            { "bundle": "bad", "assets": [ { "name": "x", "locations": {} } ] },
            { "bundle": "good", "dependencies": ["nowhere"], "assets": [
                { "name": "g", "version": "1", "locations": { "webapp": "/g.js" } } ] }
        ]"#,
    )
    .unwrap();

    let loader = JsonBundleLoader::new("user", LoaderKind::User, dir.bundles_path());
    let mut store = BundleStore::new();
    load_all(&mut store, &[&loader]).unwrap();

    let mut invalid: Vec<String> = store
        .validate_all()
        .into_iter()
        .map(|e| match e {
            AbmError::InvalidBundle { bundle, .. } => bundle,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    invalid.sort();
    assert_eq!(invalid, vec!["bad", "empty", "nowhere"]);

    let bad = store.validate("bad").unwrap();
    assert!(bad.reasons.len() >= 2, "{:?}", bad.reasons);
}

#[test]
fn test_malformed_json_aborts_loader() {
    let dir = BundleDir::new().unwrap();
    dir.write("a.json", r#"{ "bundle": "a" }"#).unwrap();
    dir.write("b.json", r#"{ "bundle": "#).unwrap();

    let loader = JsonBundleLoader::new("user", LoaderKind::User, dir.bundles_path());
    let mut store = BundleStore::new();
    let err = load_all(&mut store, &[&loader]).unwrap_err();

    let parse = err.chain().find_map(|cause| cause.downcast_ref::<AbmError>());
    assert!(matches!(parse, Some(AbmError::BundleDefinitionParseError { .. })));
    assert!(store.graph().is_empty());
}
