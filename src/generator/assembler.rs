//! Role-by-role assembly of an entity's permission document.
//!
//! For each role the table filters and the per-field grants are resolved, and an
//! entry is emitted for an action only when a filter exists *and* (for
//! select/insert/update) at least one column grants the action.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::permissions::actions::TableAction;
use crate::permissions::field::ResolvedFieldAccess;
use crate::permissions::roles::RoleHierarchy;
use crate::permissions::table::{Filter, ResolvedTableFilters, TablePermissions};
use crate::schema::entity::{EntityDef, FieldDef};

use super::metadata::{
    DeletePermission, DeletePermissionEntry, InsertPermission, InsertPermissionEntry,
    PermissionDocument, SelectPermission, SelectPermissionEntry, UpdatePermission,
    UpdatePermissionEntry,
};

/// Hook applied to every emitted filter and check expression.
pub type FilterWrapper = Box<dyn Fn(&Filter) -> Filter + Send + Sync>;

/// Builds and memoizes permission documents, keyed by entity name.
///
/// Declarations are immutable for the lifetime of a run, so a document once
/// derived is shared as-is.
pub struct PermissionAssembler<'a> {
    roles: &'a RoleHierarchy,
    wrapper: Option<FilterWrapper>,
    cache: Mutex<HashMap<String, Option<Arc<PermissionDocument>>>>,
}

/// One column and the access every considered role has to it.
struct ColumnGrants {
    column: String,
    by_role: HashMap<String, ResolvedFieldAccess>,
}

impl<'a> PermissionAssembler<'a> {
    /// Assembler over `roles` with no filter wrapper.
    pub fn new(roles: &'a RoleHierarchy) -> Self {
        Self {
            roles,
            wrapper: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Pass every emitted filter/check through `wrapper`.
    pub fn with_filter_wrapper(
        mut self,
        wrapper: impl Fn(&Filter) -> Filter + Send + Sync + 'static,
    ) -> Self {
        self.wrapper = Some(Box::new(wrapper));
        self
    }

    /// Roles considered for `permissions`: every hierarchy role in declaration
    /// order, then the overlay roles the table configures.
    pub fn roles_for(&self, permissions: &TablePermissions) -> Vec<String> {
        let overlays = self.roles.overlays();
        self.roles
            .roles()
            .map(ToString::to_string)
            .chain(
                [&overlays.pre_auth, &overlays.post_auth]
                    .into_iter()
                    .filter(|role| permissions.configures(role))
                    .cloned(),
            )
            .collect()
    }

    /// Permission document of `entity`, or `None` when it declares no table permissions.
    pub fn assemble(
        &self,
        entity: &EntityDef,
    ) -> Result<Option<Arc<PermissionDocument>>, ConfigError> {
        // Held across the build so concurrent first calls share one document.
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.get(&entity.name) {
            debug!(entity = %entity.name, "permission document served from cache");
            return Ok(cached.clone());
        }

        let document = self.build(entity)?.map(Arc::new);
        cache.insert(entity.name.clone(), document.clone());
        Ok(document)
    }

    fn build(&self, entity: &EntityDef) -> Result<Option<PermissionDocument>, ConfigError> {
        let Some(table_permissions) = &entity.permissions else {
            warn!(entity = %entity.name, "entity has no table permissions; skipped");
            return Ok(None);
        };

        let roles = self.roles_for(table_permissions);
        let columns = self.column_grants(entity, &roles)?;

        let mut document = PermissionDocument::default();
        for role in &roles {
            let filters = self.roles.resolve_table(table_permissions, role)?;
            self.emit_role(&mut document, role, &filters, &columns);
        }

        Ok(Some(document))
    }

    fn column_grants(
        &self,
        entity: &EntityDef,
        roles: &[String],
    ) -> Result<Vec<ColumnGrants>, ConfigError> {
        let mut out = Vec::new();
        for field in entity.fields.iter().filter(|f| f.is_column()) {
            let column = storage_column(field);

            let Some(permissions) = &field.permissions else {
                if field.primary_key {
                    // Undeclared primary keys stay readable for every hierarchy role.
                    let by_role = roles
                        .iter()
                        .filter(|role| self.roles.contains(role))
                        .map(|role| (role.clone(), ResolvedFieldAccess::select_only()))
                        .collect();
                    out.push(ColumnGrants { column, by_role });
                } else {
                    info!(entity = %entity.name, field = %field.name, "field has no permissions");
                }
                continue;
            };

            let mut by_role = HashMap::with_capacity(roles.len());
            for role in roles {
                let access = self
                    .roles
                    .resolve_field(permissions, field.presets.as_ref(), role)?;
                by_role.insert(role.clone(), access);
            }
            out.push(ColumnGrants { column, by_role });
        }
        Ok(out)
    }

    fn emit_role(
        &self,
        document: &mut PermissionDocument,
        role: &str,
        filters: &ResolvedTableFilters,
        columns: &[ColumnGrants],
    ) {
        let granted = |action: TableAction| {
            columns
                .iter()
                .filter_map(|c| {
                    let access = c.by_role.get(role)?;
                    access
                        .code
                        .grants(action)
                        .then_some((c.column.as_str(), access))
                })
                .collect::<Vec<_>>()
        };

        if let Some(filter) = filters.get(TableAction::Select) {
            let cols = granted(TableAction::Select);
            if !cols.is_empty() {
                document.select_permissions.push(SelectPermissionEntry {
                    role: role.to_string(),
                    permission: SelectPermission {
                        filter: self.wrap(filter),
                        columns: column_names(&cols),
                        allow_aggregations: true,
                    },
                    comment: None,
                });
            }
        }

        if let Some(check) = filters.get(TableAction::Insert) {
            let cols = granted(TableAction::Insert);
            if !cols.is_empty() {
                document.insert_permissions.push(InsertPermissionEntry {
                    role: role.to_string(),
                    permission: InsertPermission {
                        check: self.wrap(check),
                        columns: column_names(&cols),
                        set: presets(&cols, |a| a.preset_insert.as_ref()),
                    },
                    backend_only: false,
                });
            }
        }

        if let Some(filter) = filters.get(TableAction::Update) {
            let cols = granted(TableAction::Update);
            if !cols.is_empty() {
                document.update_permissions.push(UpdatePermissionEntry {
                    role: role.to_string(),
                    permission: UpdatePermission {
                        filter: self.wrap(filter),
                        check: Value::Object(Map::new()),
                        columns: column_names(&cols),
                        set: presets(&cols, |a| a.preset_update.as_ref()),
                    },
                });
            }
        }

        if let Some(filter) = filters.get(TableAction::Delete) {
            document.delete_permissions.push(DeletePermissionEntry {
                role: role.to_string(),
                permission: DeletePermission {
                    filter: self.wrap(filter),
                },
            });
        }
    }

    fn wrap(&self, filter: &Filter) -> Filter {
        match &self.wrapper {
            Some(wrapper) => wrapper(filter),
            None => filter.clone(),
        }
    }
}

/// Storage column of a field, falling back to its logical name.
fn storage_column(field: &FieldDef) -> String {
    field.column_name().unwrap_or_else(|| field.name.clone())
}

fn column_names(cols: &[(&str, &ResolvedFieldAccess)]) -> Vec<String> {
    cols.iter().map(|(c, _)| (*c).to_string()).collect()
}

fn presets(
    cols: &[(&str, &ResolvedFieldAccess)],
    pick: impl Fn(&ResolvedFieldAccess) -> Option<&Value>,
) -> IndexMap<String, Value> {
    cols.iter()
        .filter_map(|(column, access)| pick(access).map(|v| ((*column).to_string(), v.clone())))
        .collect()
}
