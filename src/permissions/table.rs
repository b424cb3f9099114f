use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::actions::TableAction;

/// Opaque, engine-specific row predicate. Passed through, never interpreted.
///
/// `{}` means unrestricted access; an absent filter means no access.
pub type Filter = Value;

/// Filters declared by one role on one table.
///
/// An object whose keys are all action names is read as [`ActionFilters`]; any
/// other non-empty object is a shared filter. A bare `{}` grants unrestricted
/// select and nothing else. `null` declares the role without granting anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RoleTableConfig {
    /// One filter per action; unset actions are not granted.
    PerAction(ActionFilters),
    /// A single filter used for select, insert and update. Never grants delete.
    Shared(Map<String, Value>),
    /// Explicitly no access.
    Denied,
}

/// Explicit per-action filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionFilters {
    /// Row filter for reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Filter>,
    /// Check applied to inserted rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<Filter>,
    /// Row filter for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Filter>,
    /// Row filter for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Filter>,
}

impl ActionFilters {
    /// Set the filter of `action`.
    pub fn with(mut self, action: TableAction, filter: Filter) -> Self {
        *self.slot(action) = Some(filter);
        self
    }

    fn slot(&mut self, action: TableAction) -> &mut Option<Filter> {
        match action {
            TableAction::Select => &mut self.select,
            TableAction::Insert => &mut self.insert,
            TableAction::Update => &mut self.update,
            TableAction::Delete => &mut self.delete,
        }
    }

    fn get(&self, action: TableAction) -> Option<&Filter> {
        match action {
            TableAction::Select => self.select.as_ref(),
            TableAction::Insert => self.insert.as_ref(),
            TableAction::Update => self.update.as_ref(),
            TableAction::Delete => self.delete.as_ref(),
        }
    }
}

impl<'de> Deserialize<'de> for RoleTableConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Some(map) = Option::<Map<String, Value>>::deserialize(deserializer)? else {
            return Ok(RoleTableConfig::Denied);
        };
        if map.is_empty() {
            return Ok(RoleTableConfig::PerAction(
                ActionFilters::default().with(TableAction::Select, Value::Object(Map::new())),
            ));
        }
        let per_action = map
            .keys()
            .all(|key| TableAction::ALL.iter().any(|a| a.as_str() == key));
        if per_action {
            serde_json::from_value(Value::Object(map))
                .map(RoleTableConfig::PerAction)
                .map_err(D::Error::custom)
        } else {
            Ok(RoleTableConfig::Shared(map))
        }
    }
}

impl RoleTableConfig {
    /// The filter this entry declares for `action`, if any.
    pub fn filter(&self, action: TableAction) -> Option<Filter> {
        match self {
            RoleTableConfig::PerAction(filters) => filters.get(action).cloned(),
            RoleTableConfig::Denied => None,
            RoleTableConfig::Shared(_) if action == TableAction::Delete => None,
            RoleTableConfig::Shared(map) => Some(Value::Object(map.clone())),
        }
    }
}

/// Table-level filters of one entity, keyed by role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TablePermissions {
    config: IndexMap<String, RoleTableConfig>,
}

impl TablePermissions {
    /// No entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry of `role`.
    pub fn with_role(mut self, role: impl Into<String>, config: RoleTableConfig) -> Self {
        self.config.insert(role.into(), config);
        self
    }

    /// The entry declared by `role`.
    pub fn get(&self, role: &str) -> Option<&RoleTableConfig> {
        self.config.get(role)
    }

    /// True when `role` declares an entry.
    pub fn configures(&self, role: &str) -> bool {
        self.config.contains_key(role)
    }

    /// Roles with an entry, in declaration order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.config.keys().map(String::as_str)
    }
}

/// Effective table filters of one role. `None` suppresses the permission entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTableFilters {
    /// Row filter for reads.
    pub select: Option<Filter>,
    /// Check for inserts.
    pub insert: Option<Filter>,
    /// Row filter for updates.
    pub update: Option<Filter>,
    /// Row filter for deletes.
    pub delete: Option<Filter>,
}

impl ResolvedTableFilters {
    /// Filter resolved for `action`.
    pub fn get(&self, action: TableAction) -> Option<&Filter> {
        match action {
            TableAction::Select => self.select.as_ref(),
            TableAction::Insert => self.insert.as_ref(),
            TableAction::Update => self.update.as_ref(),
            TableAction::Delete => self.delete.as_ref(),
        }
    }

    fn slot(&mut self, action: TableAction) -> &mut Option<Filter> {
        match action {
            TableAction::Select => &mut self.select,
            TableAction::Insert => &mut self.insert,
            TableAction::Update => &mut self.update,
            TableAction::Delete => &mut self.delete,
        }
    }

    /// True when no action resolved to a filter.
    pub fn is_empty(&self) -> bool {
        TableAction::ALL.iter().all(|a| self.get(*a).is_none())
    }
}

/// First match wins, per action, walking `resolution` in priority order.
///
/// Filters are never combined: the highest-priority role defining a filter for an
/// action supplies it unchanged.
pub fn resolve_table(permissions: &TablePermissions, resolution: &[String]) -> ResolvedTableFilters {
    let mut out = ResolvedTableFilters::default();
    for role in resolution {
        let Some(config) = permissions.get(role) else {
            continue;
        };
        for action in TableAction::ALL {
            let slot = out.slot(action);
            if slot.is_none() {
                *slot = config.filter(action);
            }
        }
    }
    out
}

/// Filters of exactly one role, restricted to `allowed` actions.
pub fn resolve_table_standalone(
    permissions: &TablePermissions,
    role: &str,
    allowed: &[TableAction],
) -> ResolvedTableFilters {
    let mut out = ResolvedTableFilters::default();
    if let Some(config) = permissions.get(role) {
        for action in allowed {
            *out.slot(*action) = config.filter(*action);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn list(roles: &[&str]) -> Vec<String> {
        roles.iter().map(ToString::to_string).collect()
    }

    fn parse(value: Value) -> TablePermissions {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn action_keyed_objects_parse_as_per_action_filters() {
        let perms = parse(json!({
            "project": {"parent_model": {"ids": {"_eq": "test"}}},
            "project_management": {"select": {}, "delete": {"owner": {"_eq": "X-Hasura-User-Id"}}},
        }));

        assert!(matches!(perms.get("project"), Some(RoleTableConfig::Shared(_))));
        assert!(matches!(
            perms.get("project_management"),
            Some(RoleTableConfig::PerAction(_))
        ));
    }

    #[test]
    fn inherited_empty_filter_is_kept_distinct_from_absent() {
        let perms = parse(json!({"b": {"select": {}}}));
        let resolved = resolve_table(&perms, &list(&["a", "b"]));
        assert_eq!(resolved.select, Some(json!({})));
        assert_eq!(resolved.insert, None);
        assert_eq!(resolved.delete, None);
    }

    #[test]
    fn first_match_wins_without_merging() {
        let perms = parse(json!({
            "a": {"select": {"x": {"_eq": 1}}},
            "b": {"select": {"y": {"_eq": 2}}, "update": {"y": {"_eq": 2}}},
        }));
        let resolved = resolve_table(&perms, &list(&["a", "b"]));
        assert_eq!(resolved.select, Some(json!({"x": {"_eq": 1}})));
        assert_eq!(resolved.update, Some(json!({"y": {"_eq": 2}})));
    }

    #[test]
    fn shared_filters_never_grant_delete() {
        let filter = json!({"owner_id": {"_eq": "X-Hasura-User-Id"}});
        let perms = parse(json!({"user_self": filter.clone()}));
        let resolved = resolve_table(&perms, &list(&["user_self"]));
        assert_eq!(resolved.select.as_ref(), Some(&filter));
        assert_eq!(resolved.insert.as_ref(), Some(&filter));
        assert_eq!(resolved.update.as_ref(), Some(&filter));
        assert_eq!(resolved.delete, None);
    }

    #[test]
    fn empty_objects_grant_select_only() {
        let perms = parse(json!({"project": {}}));
        assert!(matches!(perms.get("project"), Some(RoleTableConfig::PerAction(_))));

        let resolved = resolve_table(&perms, &list(&["project"]));
        assert_eq!(resolved.select, Some(json!({})));
        assert_eq!(resolved.insert, None);
        assert_eq!(resolved.update, None);
        assert_eq!(resolved.delete, None);
    }

    #[test]
    fn null_roles_declare_no_access() {
        let perms = parse(json!({"public": null, "project": {"select": {}}}));
        assert_eq!(perms.get("public"), Some(&RoleTableConfig::Denied));
        let resolved = resolve_table(&perms, &list(&["project", "public"]));
        assert_eq!(resolved.select, Some(json!({})));
        assert!(resolve_table(&perms, &list(&["public"])).is_empty());
    }

    #[test]
    fn null_entries_count_as_absent() {
        let perms = parse(json!({"a": {"select": null}, "b": {"select": {}}}));
        let resolved = resolve_table(&perms, &list(&["a", "b"]));
        assert_eq!(resolved.select, Some(json!({})));
    }

    #[test]
    fn standalone_resolution_honours_the_allowed_actions() {
        let perms = parse(json!({"module_auth": {"select": {}, "insert": {}, "delete": {}}}));
        let pre = resolve_table_standalone(&perms, "module_auth", &[TableAction::Select]);
        assert_eq!(pre.select, Some(json!({})));
        assert_eq!(pre.insert, None);
        assert!(resolve_table_standalone(&perms, "other", &TableAction::ALL).is_empty());
    }
}
