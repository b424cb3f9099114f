use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::generator::metadata::{TrackedFunction, TrackedView};
use crate::permissions::field::PUBLIC_ROLE;
use crate::permissions::roles::{PermissionTree, RoleHierarchy};

use super::entity::EntityDef;
use super::registry::EntityRegistry;

/// On-disk registry document: settings, role tree, entities, views, functions.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryDocument {
    /// Generation settings.
    #[serde(default)]
    pub settings: Settings,
    /// Role → parent roles.
    pub permission_tree: PermissionTree,
    /// Entities in registration order.
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    /// Hand-declared views.
    #[serde(default)]
    pub views: Vec<TrackedView>,
    /// Hand-declared functions.
    #[serde(default)]
    pub functions: Vec<TrackedFunction>,
}

impl RegistryDocument {
    /// Decode a registry document from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and decode a registry document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&content)
    }
}

/// A validated generation input: role hierarchy, entities, views and functions.
#[derive(Debug, Clone)]
pub struct Project {
    /// Generation settings.
    pub settings: Settings,
    /// Flattened role hierarchy.
    pub roles: RoleHierarchy,
    /// Registered entities.
    pub registry: EntityRegistry,
    /// Registered views, emitted after the entity tables.
    pub views: Vec<TrackedView>,
    /// Registered functions.
    pub functions: Vec<TrackedFunction>,
}

impl Project {
    /// Build an empty project around a validated hierarchy.
    pub fn new(settings: Settings, roles: RoleHierarchy) -> Self {
        Self {
            settings,
            roles,
            registry: EntityRegistry::new(),
            views: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Register a view with hand-written select permissions.
    pub fn register_view(&mut self, view: TrackedView) {
        self.views.push(view);
    }

    /// Register a tracked function.
    pub fn register_function(&mut self, function: TrackedFunction) {
        self.functions.push(function);
    }

    /// Validate a decoded document.
    ///
    /// Hierarchy and registry errors are fatal. Roles referenced by field or table
    /// declarations that the hierarchy does not know are only logged.
    pub fn from_document(document: RegistryDocument) -> Result<Self> {
        let roles = RoleHierarchy::new(
            &document.permission_tree,
            document.settings.overlay_roles.clone(),
        )?;

        let mut project = Project::new(document.settings, roles);
        project.registry.register_all(document.entities)?;
        project.registry.validate()?;
        document
            .views
            .into_iter()
            .for_each(|v| project.register_view(v));
        document
            .functions
            .into_iter()
            .for_each(|f| project.register_function(f));

        project.warn_unknown_roles();
        info!(
            roles = project.roles.roles().count(),
            entities = project.registry.len(),
            views = project.views.len(),
            functions = project.functions.len(),
            "registry loaded"
        );
        Ok(project)
    }

    /// Read, decode and validate a registry document.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_document(RegistryDocument::load(path)?)
    }

    fn warn_unknown_roles(&self) {
        let known = |role: &str| role == PUBLIC_ROLE || self.roles.is_known(role);

        for entity in self.registry.iter() {
            if let Some(table) = &entity.permissions {
                for role in table.roles().filter(|r| !known(r)) {
                    warn!(entity = %entity.name, role, "table permission references unknown role");
                }
            }
            for field in &entity.fields {
                let field_roles = field
                    .permissions
                    .iter()
                    .flat_map(|p| p.roles())
                    .chain(field.presets.iter().flat_map(|p| p.roles()));
                for role in field_roles.filter(|r| !known(r)) {
                    warn!(
                        entity = %entity.name,
                        field = %field.name,
                        role,
                        "field permission references unknown role"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn documents_build_validated_projects() {
        let project = Project::from_document(
            RegistryDocument::from_json(
                r#"{
                    "permission_tree": {"public": [], "auth": ["public"]},
                    "entities": [
                        {"name": "Organization", "permissions": {"auth": {"select": {}}}}
                    ],
                    "functions": [{"function": {"name": "auth_user"}, "permissions": [{"role": "module_auth"}]}]
                }"#,
            )
            .unwrap(),
        )
        .unwrap();

        assert_eq!(project.roles.resolve("auth").unwrap(), ["auth", "public"]);
        assert_eq!(project.registry.len(), 1);
        assert_eq!(project.functions.len(), 1);
    }

    #[test]
    fn hierarchy_errors_abort_loading() {
        let document = RegistryDocument::from_json(
            r#"{"permission_tree": {"auth": ["public"]}}"#,
        )
        .unwrap();
        let err = Project::from_document(document).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::UnknownParentRole { .. })
        ));
    }

    #[test]
    fn malformed_action_codes_fail_decoding() {
        let err = RegistryDocument::from_json(
            r#"{
                "permission_tree": {"public": []},
                "entities": [{"name": "A", "fields": [{"name": "x", "permissions": {"public": "s--"}}]}]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().contains("invalid action code"));
    }
}
