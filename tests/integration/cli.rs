use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

use abm_cli::test_utils::BundleDir;

#[allow(deprecated)]
fn abm(dir: &BundleDir) -> Command {
    let mut cmd = Command::cargo_bin("abm").unwrap();
    cmd.current_dir(dir.path()).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn site() -> BundleDir {
    let dir = BundleDir::new().unwrap();
    dir.write(
        "jquery.json",
        r#"{ "bundle": "jquery", "assets": [
            { "name": "jquery", "version": "3.7.1", "locations": { "webapp": "/js/jquery.js" } } ] }"#,
    )
    .unwrap();
    dir.write(
        "app.json",
        r#"{ "bundle": "app", "dependencies": ["jquery"], "assets": [
            { "name": "app", "version": "1.0", "locations": { "webapp": "/js/app.js" } },
            { "name": "app", "version": "1.0", "locations": { "webapp": "/css/app.css" } } ] }"#,
    )
    .unwrap();
    dir.write_file(std::path::Path::new("webapp/js/jquery.js"), "var $ = {};\n").unwrap();
    dir.write_file(std::path::Path::new("webapp/js/app.js"), "  $.app = 1;\n").unwrap();
    dir.write_file(std::path::Path::new("webapp/css/app.css"), "body { color: red; }\n").unwrap();
    dir.write_config("webapp_root = \"webapp\"\ncontext_path = \"/shop\"\n").unwrap();
    dir
}

#[test]
fn test_help_lists_commands() {
    let dir = BundleDir::new().unwrap();
    abm(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("tree"))
        .stdout(predicate::str::contains("build"));
}

#[test]
fn test_validate_valid_site() {
    let dir = site();
    abm(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("All 2 bundle(s) are valid"));
}

#[test]
fn test_validate_reports_every_invalid_bundle() {
    let dir = site();
    dir.write("broken.json", r#"[ { "bundle": "empty" }, { "bundle": "orphan", "dependencies": ["ghost"] } ]"#)
        .unwrap();

    abm(&dir)
        .args(["validate", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"empty\""))
        .stdout(predicate::str::contains("\"orphan\""))
        .stdout(predicate::str::contains("missing bundle definition"))
        .stderr(predicate::str::contains("3 of 5 bundle(s) failed validation"));
}

#[test]
fn test_resolve_json_order() {
    let dir = site();
    let output = abm(&dir).args(["resolve", "app", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let bundles: Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = bundles.as_array().unwrap().iter().map(|b| b["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["jquery", "app"]);
    assert_eq!(bundles[1]["assets"].as_array().unwrap().len(), 2);
}

#[test]
fn test_resolve_unknown_bundle_fails() {
    let dir = site();
    abm(&dir)
        .args(["resolve", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bundle 'nope' not found"));
}

#[test]
fn test_tree() {
    let dir = site();
    abm(&dir).args(["tree", "app"]).assert().success().stdout("app\n└── jquery\n");
}

#[test]
fn test_cycle_fails_loading() {
    let dir = BundleDir::new().unwrap();
    dir.write("a.json", r#"[ { "bundle": "a", "dependencies": ["b"] }, { "bundle": "b", "dependencies": ["a"] } ]"#)
        .unwrap();

    abm(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency"));
}

#[test]
fn test_build_writes_output() {
    let dir = site();
    let out = dir.path().join("dist");

    let output = abm(&dir)
        .args(["build", "app", "--url", "/shop/index.html", "--format", "json", "--stats", "--output"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    let assets = report["assets"].as_array().unwrap();
    assert_eq!(assets.len(), 2);
    assert!(assets.iter().all(|a| a["aggregate"] == Value::Bool(true)));
    assert_eq!(report["warnings"].as_array().unwrap().len(), 0);
    assert!(report["stats"]["puts"].as_u64().unwrap() > 0);

    let js_key = assets[0]["storage_key"].as_str().unwrap();
    let written = std::fs::read_to_string(out.join(js_key)).unwrap();
    assert_eq!(written, "var $ = {};\n$.app = 1;\n");
}

#[test]
fn test_missing_explicit_config() {
    let dir = site();
    abm(&dir)
        .args(["--config", "missing.toml", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn test_bundles_dir_override() {
    let dir = site();
    let other = dir.path().join("other");
    std::fs::create_dir_all(&other).unwrap();
    std::fs::write(other.join("solo.json"), r#"{ "bundle": "solo" }"#).unwrap();

    abm(&dir)
        .args(["--config", "abm.toml", "--bundles-dir"])
        .arg(&other)
        .args(["resolve", "solo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("solo"));
}
