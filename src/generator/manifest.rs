use std::sync::Arc;

use tracing::info;

use crate::error::ConfigError;
use crate::permissions::table::Filter;
use crate::schema::document::Project;

use super::assembler::PermissionAssembler;
use super::metadata::{
    HasuraMetadata, MetadataBody, PermissionDocument, Source, SourceConfiguration, TableEntry,
};
use super::relationships::{attach_many_to_many, classify, many_to_many_joins, qualified_table};

/// Resource version written into every export.
pub const RESOURCE_VERSION: u64 = 1;
/// Metadata format version.
pub const METADATA_VERSION: u32 = 3;

/// A finished manifest and what was left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedManifest {
    /// The export document.
    pub metadata: HasuraMetadata,
    /// Entities tracked without permissions, in registration order.
    pub skipped: Vec<String>,
}

/// Turns a validated [`Project`] into the export document.
pub struct ManifestBuilder<'a> {
    project: &'a Project,
    assembler: PermissionAssembler<'a>,
}

impl<'a> ManifestBuilder<'a> {
    /// Builder over `project`.
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            assembler: PermissionAssembler::new(&project.roles),
        }
    }

    /// Pass every emitted filter/check through `wrapper`.
    pub fn with_filter_wrapper(
        mut self,
        wrapper: impl Fn(&Filter) -> Filter + Send + Sync + 'static,
    ) -> Self {
        self.assembler = self.assembler.with_filter_wrapper(wrapper);
        self
    }

    /// The assembler, with whatever documents it has memoized so far.
    pub fn assembler(&self) -> &PermissionAssembler<'a> {
        &self.assembler
    }

    /// Entity tables in registration order, then join tables, then views.
    pub fn build(&self) -> Result<GeneratedManifest, ConfigError> {
        let registry = &self.project.registry;
        let mut tables = Vec::with_capacity(registry.len());
        let mut skipped = Vec::new();

        for entity in registry.concrete() {
            info!(entity = %entity.name, "processing entity");
            let relationships = classify(entity, registry);

            let mut entry = TableEntry::new(qualified_table(entity));
            entry.is_enum = entity.is_enum();
            entry.object_relationships = relationships.object_relationships;
            entry.array_relationships = relationships.array_relationships;
            match self.assembler.assemble(entity)? {
                Some(document) => entry.permissions = unshare(document),
                None => skipped.push(entity.name.clone()),
            }
            tables.push(entry);
        }

        for join in many_to_many_joins(registry) {
            let mut entry = join.table_entry();
            if let Some(document) = self.assembler.assemble(&join.entity)? {
                entry.permissions = unshare(document);
            }
            attach_many_to_many(&mut tables, &join, entry);
        }

        tables.extend(self.project.views.iter().cloned().map(TableEntry::from));

        let settings = &self.project.settings.source;
        let metadata = HasuraMetadata {
            resource_version: RESOURCE_VERSION,
            metadata: MetadataBody {
                version: METADATA_VERSION,
                sources: vec![Source {
                    name: settings.name.clone(),
                    kind: settings.kind.clone(),
                    tables,
                    functions: self.project.functions.clone(),
                    configuration: SourceConfiguration::from(settings),
                }],
            },
        };

        Ok(GeneratedManifest { metadata, skipped })
    }
}

fn unshare(document: Arc<PermissionDocument>) -> PermissionDocument {
    Arc::try_unwrap(document).unwrap_or_else(|shared| (*shared).clone())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::document::RegistryDocument;

    fn project(value: serde_json::Value) -> Project {
        let document: RegistryDocument = serde_json::from_value(value).unwrap();
        Project::from_document(document).unwrap()
    }

    #[test]
    fn envelope_carries_versions_and_source_defaults() {
        let project = project(json!({"permission_tree": {"public": []}}));
        let manifest = ManifestBuilder::new(&project).build().unwrap();

        assert_eq!(
            serde_json::to_value(&manifest.metadata).unwrap(),
            json!({
                "resource_version": 1,
                "metadata": {
                    "version": 3,
                    "sources": [{
                        "name": "default",
                        "kind": "postgres",
                        "tables": [],
                        "functions": [],
                        "configuration": {"connection_info": {
                            "database_url": {"from_env": "HASURA_GRAPHQL_DATABASE_URL"},
                            "isolation_level": "read-committed",
                            "pool_settings": {
                                "connection_lifetime": 600,
                                "idle_timeout": 180,
                                "max_connections": 50,
                                "retries": 1,
                            },
                            "use_prepared_statements": true,
                        }},
                    }],
                },
            })
        );
    }

    #[test]
    fn tables_are_ordered_entities_then_joins_then_views() {
        let project = project(json!({
            "permission_tree": {"public": []},
            "entities": [
                {"name": "Base", "abstract": true},
                {"name": "Tag", "fields": [{"name": "label", "permissions": {"public": "-s-"}}],
                 "permissions": {"public": {"select": {}}}},
                {"name": "Post", "fields": [{"name": "tags", "relation": {"kind": "many_to_many", "to": "Tag"}}]},
            ],
            "views": [{"table": {"name": "vw_post_stats"}}],
        }));
        let manifest = ManifestBuilder::new(&project).build().unwrap();

        let tables: Vec<&str> = manifest.metadata.metadata.sources[0]
            .tables
            .iter()
            .map(|t| t.table.name.as_str())
            .collect();
        assert_eq!(tables, ["app_tag", "app_post", "app_post_tags", "vw_post_stats"]);
        assert_eq!(manifest.skipped, ["Post"]);
    }

    #[test]
    fn filter_wrapper_reaches_the_manifest() {
        let project = project(json!({
            "permission_tree": {"public": []},
            "entities": [{"name": "Tag", "permissions": {"public": {"select": {}}}}],
        }));
        let manifest = ManifestBuilder::new(&project)
            .with_filter_wrapper(|_| json!({"active": {"_eq": true}}))
            .build()
            .unwrap();

        let tag = &manifest.metadata.metadata.sources[0].tables[0];
        // implicit id primary key is readable by every hierarchy role
        assert_eq!(tag.permissions.select_permissions[0].permission.columns, ["id"]);
        assert_eq!(
            tag.permissions.select_permissions[0].permission.filter,
            json!({"active": {"_eq": true}})
        );
    }
}
