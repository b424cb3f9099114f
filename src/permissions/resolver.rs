use crate::error::ConfigError;

use super::actions::TableAction;
use super::field::{
    resolve_field, resolve_field_standalone, FieldPermissions, FieldPresets, ResolvedFieldAccess,
};
use super::roles::{OverlayKind, RoleHierarchy};
use super::table::{resolve_table, resolve_table_standalone, ResolvedTableFilters, TablePermissions};

const POST_AUTH_ACTIONS: [TableAction; 3] =
    [TableAction::Select, TableAction::Insert, TableAction::Update];

impl RoleHierarchy {
    /// Effective access of `role` to a field.
    ///
    /// Hierarchy roles merge their whole resolution list; overlay roles only see
    /// their own entry (pre-auth is further limited to select).
    pub fn resolve_field(
        &self,
        permissions: &FieldPermissions,
        presets: Option<&FieldPresets>,
        role: &str,
    ) -> Result<ResolvedFieldAccess, ConfigError> {
        match self.overlay_kind(role) {
            Some(OverlayKind::PreAuth) => Ok(resolve_field_standalone(
                permissions,
                presets,
                role,
                true,
            )),
            Some(OverlayKind::PostAuth) => Ok(resolve_field_standalone(
                permissions,
                presets,
                role,
                false,
            )),
            None => Ok(resolve_field(permissions, presets, self.resolve(role)?)),
        }
    }

    /// Effective table filters of `role`.
    pub fn resolve_table(
        &self,
        permissions: &TablePermissions,
        role: &str,
    ) -> Result<ResolvedTableFilters, ConfigError> {
        match self.overlay_kind(role) {
            Some(OverlayKind::PreAuth) => Ok(resolve_table_standalone(
                permissions,
                role,
                &[TableAction::Select],
            )),
            Some(OverlayKind::PostAuth) => Ok(resolve_table_standalone(
                permissions,
                role,
                &POST_AUTH_ACTIONS,
            )),
            None => Ok(resolve_table(permissions, self.resolve(role)?)),
        }
    }
}
