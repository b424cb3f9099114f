//! Storage naming conventions for entities that do not spell their names out.
//!
//! Defaults follow the ORM conventions the registries are exported from:
//! `<app_label>_<entity>` tables, `<field>_id` foreign-key columns, and
//! `<entity>_set` reverse accessors.

/// Storage schema used when an entity does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Lowercase an entity name the way storage identifiers expect.
pub fn lower_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// `<app_label>_<entity>`, lowercased.
pub fn default_table_name(app_label: &str, entity: &str) -> String {
    format!("{}_{}", lower_name(app_label), lower_name(entity))
}

/// Column holding a foreign key declared by `field`.
pub fn default_fk_column(field: &str) -> String {
    format!("{field}_id")
}

/// Reverse accessor of a to-many relation when none is configured.
pub fn default_set_accessor(source_entity: &str) -> String {
    format!("{}_set", lower_name(source_entity))
}

/// Reverse accessor of a one-to-one relation when none is configured.
pub fn default_one_to_one_accessor(source_entity: &str) -> String {
    lower_name(source_entity)
}

/// A related name ending in `+` suppresses the reverse relationship.
pub fn is_hidden_related_name(name: &str) -> bool {
    name.ends_with('+')
}

/// Join table synthesized for a many-to-many field.
pub fn join_table_name(source_table: &str, field: &str) -> String {
    format!("{source_table}_{field}")
}

/// Columns of a synthesized join table pointing at `(source, target)`.
///
/// Self-referential relations get `from_`/`to_` prefixes to stay distinct.
pub fn join_columns(source_entity: &str, target_entity: &str) -> (String, String) {
    let source = lower_name(source_entity);
    let target = lower_name(target_entity);
    if source == target {
        (format!("from_{source}_id"), format!("to_{target}_id"))
    } else {
        (format!("{source}_id"), format!("{target}_id"))
    }
}

/// Relationship names on a join table pointing back at `(source, target)`.
pub fn join_relationship_names(source_entity: &str, target_entity: &str) -> (String, String) {
    let source = lower_name(source_entity);
    let target = lower_name(target_entity);
    if source == target {
        (format!("from_{source}"), format!("to_{target}"))
    } else {
        (source, target)
    }
}
