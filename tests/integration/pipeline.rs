use std::sync::Arc;

use abm_cli::config::{EngineConfig, Profile};
use abm_cli::core::{AbmError, AssetUnit, BundleUnit};
use abm_cli::engine::AssetEngineBuilder;
use abm_cli::pipeline::{Processor, select_location};
use abm_cli::test_utils::{BundleDir, CountingProcessor, FailingProcessor, init_test_logging, memory_engine};

fn plain_config() -> EngineConfig {
    EngineConfig {
        aggregation: false,
        minification: false,
        ..EngineConfig::default()
    }
}

#[test]
fn test_location_selection_follows_strategy() {
    let asset = AssetUnit::new("a", "1").with_location("webapp", "/a.js").with_location("cdn", "http://x/a.js");

    let strategy = vec!["cdn".to_string(), "webapp".to_string()];
    assert_eq!(select_location(&asset, &strategy), Some(("cdn", "http://x/a.js")));

    let strategy = vec!["file".to_string(), "webapp".to_string()];
    assert_eq!(select_location(&asset, &strategy), Some(("webapp", "/a.js")));

    let strategy = vec!["file".to_string()];
    assert_eq!(select_location(&asset, &strategy), None);
}

#[test]
fn test_webapp_assets_with_url_rewriting() {
    init_test_logging(None);
    let site = BundleDir::new().unwrap();
    site.write_file(
        std::path::Path::new("webapp/css/app.css"),
        ".logo {\n  background: url('../img/logo.png');\n}\n/* footer */\n.footer { background: url(/abs.png); }\n",
    )
    .unwrap();
    site.write_file(std::path::Path::new("webapp/js/app.js"), "  var app = 1;\n\n  // init\n  app++;\n").unwrap();

    let config = EngineConfig {
        webapp_root: site.path().join("webapp"),
        context_path: "/shop".to_string(),
        aggregation: false,
        ..EngineConfig::default()
    };
    let mut engine = AssetEngineBuilder::new(config).build().unwrap();
    engine
        .load(vec![
            BundleUnit::new("app")
                .with_asset(AssetUnit::new("app", "1.0").with_location("webapp", "/css/app.css"))
                .with_asset(AssetUnit::new("app", "1.0").with_location("webapp", "/js/app.js")),
        ])
        .unwrap();

    let outcome = engine.process(&["app"], &engine.request("/shop/index.html"));
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(outcome.assets.len(), 2);

    let css = &outcome.assets[0];
    assert_eq!(css.location, "/shop/css/app.css");
    let css_content = String::from_utf8(css.entry.as_ref().unwrap().content().to_vec()).unwrap();
    assert!(css_content.contains("url('/shop/img/logo.png')"), "{css_content}");
    assert!(css_content.contains("url(/abs.png)"), "{css_content}");
    assert!(!css_content.contains("footer */"), "{css_content}");
    assert!(css.storage_key.as_deref().unwrap().contains("|compression|"));

    let js = &outcome.assets[1];
    assert_eq!(js.entry.as_ref().unwrap().content(), b"var app = 1;\napp++;");
}

#[test]
fn test_file_assets_are_served_under_url_prefix() {
    let site = BundleDir::new().unwrap();
    site.write_file(std::path::Path::new("assets/css/site.css"), "x { background: url(img/a.png) }").unwrap();

    let config = EngineConfig {
        file_root: site.path().join("assets"),
        resolution_strategy: vec!["file".to_string()],
        ..plain_config()
    };
    let mut engine = AssetEngineBuilder::new(config).build().unwrap();
    engine
        .load(vec![
            BundleUnit::new("site").with_asset(AssetUnit::new("site", "1").with_location("file", "css/site.css")),
        ])
        .unwrap();

    let outcome = engine.process(&["site"], &engine.request("/"));
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    let css = &outcome.assets[0];
    assert_eq!(css.location, "/abm/file/css/site.css");

    let content = String::from_utf8(css.entry.as_ref().unwrap().content().to_vec()).unwrap();
    assert_eq!(content, "x { background: url(/abm/file/css/img/a.png) }");
    assert!(!content.contains(&*site.path().to_string_lossy()));
}

#[test]
fn test_cdn_assets_pass_through() {
    let config = EngineConfig {
        resolution_strategy: vec!["cdn".to_string()],
        ..EngineConfig::default()
    };
    let mut engine = AssetEngineBuilder::new(config).build().unwrap();
    engine
        .load(vec![
            BundleUnit::new("jquery")
                .with_asset(AssetUnit::new("jquery", "3").with_location("cdn", "https://cdn.example.com/jquery.js")),
        ])
        .unwrap();

    let outcome = engine.process(&["jquery"], &engine.request("/"));
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.assets.len(), 1);
    assert_eq!(outcome.assets[0].location, "https://cdn.example.com/jquery.js");
    assert!(outcome.assets[0].storage_key.is_none());
    assert_eq!(engine.stats().puts, 0);
}

#[test]
fn test_processed_content_is_cached() {
    let counter = Arc::new(CountingProcessor::new("upper"));
    let processor: Arc<dyn Processor> = counter.clone();
    let engine = {
        let mut engine = memory_engine(&[("app.js", "var a;")], plain_config(), vec![processor]).unwrap();
        engine
            .load(vec![
                BundleUnit::new("app")
                    .with_asset(AssetUnit::new("app", "1").with_location("memory", "app.js").with_processors(["upper"])),
            ])
            .unwrap();
        engine
    };

    let first = engine.process(&["app"], &engine.request("/page"));
    let second = engine.process(&["app"], &engine.request("/page"));
    assert_eq!(counter.calls(), 1);
    assert_eq!(first.storage_keys(), second.storage_keys());
    assert_eq!(second.assets[0].entry.as_ref().unwrap().content(), b"VAR A;");

    // a different request URL is a different cache entry
    let _ = engine.process(&["app"], &engine.request("/other?x=1&y=2"));
    assert_eq!(counter.calls(), 2);
    assert!(engine.content_store().contains("/other_x=1_y=2|app.js|processing|js|1"));
}

#[test]
fn test_processor_failure_degrades() {
    let mut engine = memory_engine(
        &[("bad.js", "var bad;"), ("good.js", "var good;")],
        plain_config(),
        vec![Arc::new(FailingProcessor::new("explode")) as Arc<dyn Processor>],
    )
    .unwrap();
    engine
        .load(vec![
            BundleUnit::new("app")
                .with_asset(AssetUnit::new("bad", "1").with_location("memory", "bad.js").with_processors(["explode"]))
                .with_asset(AssetUnit::new("good", "1").with_location("memory", "good.js")),
        ])
        .unwrap();

    let outcome = engine.process(&["app"], &engine.request("/"));
    assert_eq!(outcome.assets.len(), 2);
    assert!(matches!(outcome.warnings.as_slice(), [AbmError::ProcessorFailure { processor, .. }] if processor == "explode"));

    let bad = &outcome.assets[0];
    assert!(bad.storage_key.is_none());
    assert_eq!(bad.entry.as_ref().unwrap().content(), b"var bad;");
    assert!(outcome.assets[1].storage_key.is_some());
}

#[test]
fn test_unresolvable_assets_are_dropped() {
    let mut engine = memory_engine(&[("ok.js", "ok")], plain_config(), Vec::new()).unwrap();
    engine
        .load(vec![
            BundleUnit::new("app")
                .with_asset(
                    AssetUnit::new("elsewhere", "1").with_location("webapp", "/w.js").with_location("file", "w.js"),
                )
                .with_asset(AssetUnit::new("typo", "1").with_location("memory", "ok.js").with_processors(["no-such"]))
                .with_asset(AssetUnit::new("missing", "1").with_location("memory", "missing.js"))
                .with_asset(AssetUnit::new("ok", "1").with_location("memory", "ok.js")),
        ])
        .unwrap();

    let outcome = engine.process(&["app"], &engine.request("/"));

    let names: Vec<_> = outcome.assets.iter().map(|p| p.asset.name.as_str()).collect();
    assert_eq!(names, vec!["missing", "ok"]);
    assert!(outcome.assets[0].entry.is_none());

    assert_eq!(outcome.warnings.len(), 3);
    assert!(matches!(outcome.warnings[0], AbmError::LocationUnresolved { .. }));
    assert!(matches!(outcome.warnings[1], AbmError::UnknownProcessor { .. }));
    assert!(matches!(outcome.warnings[2], AbmError::ContentFetchFailed { .. }));
}

#[test]
fn test_aggregation_is_idempotent() {
    let config = EngineConfig {
        minification: false,
        ..EngineConfig::default()
    };
    let mut engine = memory_engine(&[("a.js", "a"), ("b.js", "b"), ("c.css", "c{}")], config, Vec::new()).unwrap();
    engine
        .load(vec![
            BundleUnit::new("app")
                .with_asset(AssetUnit::new("a", "1").with_location("memory", "a.js"))
                .with_asset(AssetUnit::new("c", "1").with_location("memory", "c.css"))
                .with_asset(AssetUnit::new("b", "1").with_location("memory", "b.js")),
        ])
        .unwrap();

    let first = engine.process(&["app"], &engine.request("/"));
    assert_eq!(first.assets.len(), 2);
    assert!(first.assets.iter().all(|p| p.is_aggregate()));
    let js = &first.assets[0];
    assert!(js.storage_key.as_deref().unwrap().starts_with("aggregate-"));
    assert!(js.location.starts_with("/abm/aggregate/aggregate-"));
    assert_eq!(js.entry.as_ref().unwrap().content(), b"a\nb\n");

    let before = engine.stats();
    let second = engine.process(&["app"], &engine.request("/"));
    let after = engine.stats();

    assert_eq!(first.storage_keys(), second.storage_keys());
    assert_eq!(after.puts, before.puts);
    assert!(after.hits > before.hits);
}

#[test]
fn test_conditional_assets_stay_separate() {
    let mut engine = memory_engine(&[("a.js", "a"), ("ie.js", "ie")], plain_config(), Vec::new()).unwrap();
    let config_aggregating = EngineConfig {
        minification: false,
        ..EngineConfig::default()
    };
    let mut aggregating =
        memory_engine(&[("a.js", "a"), ("ie.js", "ie")], config_aggregating, Vec::new()).unwrap();

    let units = vec![
        BundleUnit::new("app")
            .with_asset(AssetUnit::new("ie", "1").with_location("memory", "ie.js").with_condition("lt IE 9"))
            .with_asset(AssetUnit::new("a", "1").with_location("memory", "a.js")),
    ];
    engine.load(units.clone()).unwrap();
    aggregating.load(units).unwrap();

    assert_eq!(engine.process(&["app"], &engine.request("/")).assets.len(), 2);

    let outcome = aggregating.process(&["app"], &aggregating.request("/"));
    assert_eq!(outcome.assets.len(), 2);
    assert_eq!(outcome.assets[0].asset.name, "ie");
    assert!(!outcome.assets[0].is_aggregate());
    assert!(outcome.assets[1].is_aggregate());
}

#[test]
fn test_development_profile_skips_aggregation_and_minification() {
    let config = EngineConfig {
        profile: Profile::Development,
        ..EngineConfig::default()
    };
    let mut engine = memory_engine(&[("a.js", "  a;\n"), ("b.js", "b;")], config, Vec::new()).unwrap();
    engine
        .load(vec![
            BundleUnit::new("app")
                .with_asset(AssetUnit::new("a", "1").with_location("memory", "a.js"))
                .with_asset(AssetUnit::new("b", "1").with_location("memory", "b.js")),
        ])
        .unwrap();

    let outcome = engine.process(&["app"], &engine.request("/"));
    assert_eq!(outcome.assets.len(), 2);
    assert_eq!(outcome.assets[0].entry.as_ref().unwrap().content(), b"  a;\n");
    assert!(outcome.assets[0].storage_key.as_deref().unwrap().contains("|processing|"));
}

#[test]
fn test_content_hash_versioning() {
    let config = EngineConfig {
        versioning: "content-hash".to_string(),
        ..plain_config()
    };
    let mut engine = memory_engine(&[("a.js", "a")], config, Vec::new()).unwrap();
    engine
        .load(vec![BundleUnit::new("app").with_asset(AssetUnit::new("a", "declared").with_location("memory", "a.js"))])
        .unwrap();

    let outcome = engine.process(&["app"], &engine.request("/"));
    let version = &outcome.assets[0].version;
    assert_eq!(version.len(), 12);
    assert!(version.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(outcome.assets[0].storage_key.as_deref().unwrap().ends_with(version.as_str()));
}
