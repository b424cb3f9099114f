mod support;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use support::read_fixture_registry_json;

fn stage_registry(root: &Path, fixture: &str) -> PathBuf {
    let backend = root.join("backend");
    std::fs::create_dir_all(&backend).expect("should create backend dir");
    let path = backend.join("registry.json");
    std::fs::write(&path, read_fixture_registry_json(fixture)).expect("should stage registry");
    path
}

fn run(args: &[&OsStr]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_schema2hasura"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("should run schema2hasura binary")
}

#[test]
fn cli_writes_to_the_default_export_path() {
    let temp = tempfile::tempdir().expect("should create temp dir");
    let registry = stage_registry(temp.path(), "role_chain");

    let output = run(&[registry.as_os_str()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.starts_with("Start generate_hasura_metadata"));
    assert!(stdout.contains("Hasura metadata exported to"));

    let exported = temp.path().join("hasura").join("hasura_metadata_exported.json");
    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&exported).expect("manifest should exist"))
            .expect("manifest should be JSON");
    assert_eq!(manifest["metadata"]["version"], 3);
}

#[test]
fn cli_resolves_a_relative_base_dir_next_to_the_registry() {
    let temp = tempfile::tempdir().expect("should create temp dir");
    // testapp declares "base_dir": "backend"
    std::fs::create_dir_all(temp.path().join("backend")).expect("should create backend dir");
    let registry = temp.path().join("registry.json");
    std::fs::write(&registry, read_fixture_registry_json("testapp")).expect("should stage registry");

    let output = run(&[registry.as_os_str()]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let exported = temp.path().join("hasura").join("hasura_metadata_exported.json");
    assert!(exported.is_file(), "manifest should land beside the registry's backend dir");
}

#[test]
fn cli_honours_export_path_report_and_pretty() {
    let temp = tempfile::tempdir().expect("should create temp dir");
    let registry = stage_registry(temp.path(), "testapp");
    let export = temp.path().join("out").join("metadata.json");
    let report = temp.path().join("out").join("report.md");

    let output = run(&[
        registry.as_os_str(),
        OsStr::new("--export-path"),
        export.as_os_str(),
        OsStr::new("--report"),
        report.as_os_str(),
        OsStr::new("--pretty"),
    ]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let manifest = std::fs::read_to_string(&export).expect("manifest should exist");
    assert!(manifest.starts_with("{\n  \"resource_version\": 1"));
    let markdown = std::fs::read_to_string(&report).expect("report should exist");
    assert!(markdown.starts_with("# schema2hasura Permission Report"));
}

#[test]
fn cli_failure_exits_2_and_keeps_the_previous_manifest() {
    let temp = tempfile::tempdir().expect("should create temp dir");
    let registry = temp.path().join("registry.json");
    std::fs::write(
        &registry,
        r#"{"permission_tree": {"a": ["b"], "b": ["a"]}}"#,
    )
    .expect("should write registry");
    let export = temp.path().join("metadata.json");
    std::fs::write(&export, "previous").expect("should write previous manifest");

    let output = run(&[
        registry.as_os_str(),
        OsStr::new("--export-path"),
        export.as_os_str(),
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("circular reference"), "stderr: {stderr}");
    assert_eq!(std::fs::read_to_string(&export).unwrap(), "previous");
}

#[test]
fn cli_reports_unreadable_registries() {
    let temp = tempfile::tempdir().expect("should create temp dir");
    let missing = temp.path().join("missing.json");

    let output = run(&[missing.as_os_str()]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("failed to access"), "stderr: {stderr}");
    assert!(stderr.contains("missing.json"), "stderr: {stderr}");
}
