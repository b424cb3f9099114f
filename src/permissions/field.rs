use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::actions::{ActionCode, PresetActions};

/// Role name used as the fallback entry of a field permission.
pub const PUBLIC_ROLE: &str = "public";

/// Per-role action codes of one field.
///
/// A role without an explicit entry falls back to the `public` entry, or to
/// `---` when `public` is unset as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPermissions {
    config: IndexMap<String, ActionCode>,
}

impl FieldPermissions {
    /// No entries at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only a `public` entry.
    pub fn public(code: ActionCode) -> Self {
        Self::new().with_role(PUBLIC_ROLE, code)
    }

    /// Add or replace the entry for `role`.
    pub fn with_role(mut self, role: impl Into<String>, code: ActionCode) -> Self {
        self.config.insert(role.into(), code);
        self
    }

    /// The explicit entry of `role`, without fallback.
    pub fn explicit(&self, role: &str) -> Option<ActionCode> {
        self.config.get(role).copied()
    }

    /// The `public` fallback entry.
    pub fn public_code(&self) -> Option<ActionCode> {
        self.explicit(PUBLIC_ROLE)
    }

    /// Roles with an explicit entry, in declaration order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.config.keys().map(String::as_str)
    }
}

/// A value filled in automatically for a column, independent of user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Writes the preset applies to.
    pub actions: PresetActions,
    /// Literal or session-variable expression (e.g. `"x-hasura-user-id"`).
    pub value: Value,
}

/// Per-role presets of one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPresets {
    config: IndexMap<String, Preset>,
}

impl FieldPresets {
    /// No presets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the preset for `role`.
    pub fn with_role(mut self, role: impl Into<String>, preset: Preset) -> Self {
        self.config.insert(role.into(), preset);
        self
    }

    /// The preset declared for `role`.
    pub fn get(&self, role: &str) -> Option<&Preset> {
        self.config.get(role)
    }

    /// Roles with a preset, in declaration order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.config.keys().map(String::as_str)
    }
}

/// Effective access of one role to one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFieldAccess {
    /// Merged action bits.
    pub code: ActionCode,
    /// Value to fill on insert, from the first role in priority order declaring one.
    pub preset_insert: Option<Value>,
    /// Value to fill on update, from the first role in priority order declaring one.
    pub preset_update: Option<Value>,
}

impl ResolvedFieldAccess {
    /// Access granting only select, as used for undeclared primary keys.
    pub fn select_only() -> Self {
        Self {
            code: ActionCode::SELECT_ONLY,
            ..Self::default()
        }
    }
}

/// Merge the entries of every role in `resolution` (priority ascending).
///
/// Action bits are OR-ed, so a lower-priority ancestor can add but never revoke
/// a grant. The first preset seen per write action wins. When no role of the
/// list has an explicit entry, the `public` entry applies.
pub fn resolve_field(
    permissions: &FieldPermissions,
    presets: Option<&FieldPresets>,
    resolution: &[String],
) -> ResolvedFieldAccess {
    let mut access = ResolvedFieldAccess::default();
    let mut matched = false;

    for role in resolution {
        if let Some(code) = permissions.explicit(role) {
            access.code = access.code.union(code);
            matched = true;
        }
        if let Some(preset) = presets.and_then(|p| p.get(role)) {
            fill_presets(&mut access, preset);
        }
    }

    if !matched {
        if let Some(code) = permissions.public_code() {
            access.code = code;
        }
    }

    access
}

/// Resolve against exactly one role, with no inheritance and no `public` fallback.
///
/// `select_only` masks insert/update (and their presets) away.
pub fn resolve_field_standalone(
    permissions: &FieldPermissions,
    presets: Option<&FieldPresets>,
    role: &str,
    select_only: bool,
) -> ResolvedFieldAccess {
    let mut access = ResolvedFieldAccess {
        code: permissions.explicit(role).unwrap_or(ActionCode::NONE),
        ..ResolvedFieldAccess::default()
    };

    if select_only {
        access.code = ActionCode {
            select: access.code.select,
            ..ActionCode::NONE
        };
        return access;
    }

    if let Some(preset) = presets.and_then(|p| p.get(role)) {
        fill_presets(&mut access, preset);
    }
    access
}

fn fill_presets(access: &mut ResolvedFieldAccess, preset: &Preset) {
    if preset.actions.insert && access.preset_insert.is_none() {
        access.preset_insert = Some(preset.value.clone());
    }
    if preset.actions.update && access.preset_update.is_none() {
        access.preset_update = Some(preset.value.clone());
    }
}
