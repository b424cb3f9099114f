#![allow(dead_code)]

use std::path::PathBuf;

use schema2hasura::generator::manifest::{GeneratedManifest, ManifestBuilder};
use schema2hasura::generator::metadata::TableEntry;
use schema2hasura::schema::document::{Project, RegistryDocument};

pub(crate) fn fixture_dir(fixture: &str) -> PathBuf {
    PathBuf::from("tests/fixtures").join(fixture)
}

pub(crate) fn fixture_registry_path(fixture: &str) -> PathBuf {
    fixture_dir(fixture).join("registry.json")
}

pub(crate) fn read_fixture_registry_json(fixture: &str) -> String {
    std::fs::read_to_string(fixture_registry_path(fixture))
        .expect("fixture registry should be readable")
}

pub(crate) fn load_fixture_document(fixture: &str) -> RegistryDocument {
    RegistryDocument::from_json(&read_fixture_registry_json(fixture))
        .expect("fixture registry should parse")
}

pub(crate) fn load_fixture_project(fixture: &str) -> Project {
    Project::from_document(load_fixture_document(fixture)).expect("fixture registry should validate")
}

pub(crate) fn build_fixture_manifest(fixture: &str) -> (Project, GeneratedManifest) {
    let project = load_fixture_project(fixture);
    let manifest = ManifestBuilder::new(&project)
        .build()
        .expect("fixture manifest should build");
    (project, manifest)
}

pub(crate) fn table<'a>(manifest: &'a GeneratedManifest, name: &str) -> &'a TableEntry {
    manifest.metadata.metadata.sources[0]
        .tables
        .iter()
        .find(|t| t.table.name == name)
        .unwrap_or_else(|| panic!("table {name} should be tracked"))
}

pub(crate) fn select_roles(entry: &TableEntry) -> Vec<&str> {
    entry
        .permissions
        .select_permissions
        .iter()
        .map(|p| p.role.as_str())
        .collect()
}
