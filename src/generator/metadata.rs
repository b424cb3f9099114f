use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SourceSettings;
use crate::permissions::table::Filter;
use crate::schema::names::DEFAULT_SCHEMA;

// ── Manifest envelope ───────────────────────────────────────────────

/// Top-level export document (metadata format version 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasuraMetadata {
    /// Resource version of the export.
    pub resource_version: u64,
    /// The metadata proper.
    pub metadata: MetadataBody,
}

/// Versioned metadata body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataBody {
    /// Metadata format version (always 3).
    pub version: u32,
    /// Database sources.
    pub sources: Vec<Source>,
}

/// One database source with its tracked tables and functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Source name.
    pub name: String,
    /// Backend kind (e.g. `postgres`).
    pub kind: String,
    /// Tracked tables and views.
    pub tables: Vec<TableEntry>,
    /// Tracked functions.
    pub functions: Vec<TrackedFunction>,
    /// Connection configuration.
    pub configuration: SourceConfiguration,
}

/// Source connection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfiguration {
    /// Connection parameters.
    pub connection_info: ConnectionInfo,
}

/// Connection parameters of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Where the engine reads the database URL from.
    pub database_url: DatabaseUrl,
    /// Transaction isolation level.
    pub isolation_level: String,
    /// Pool tuning.
    pub pool_settings: PoolSettingsEntry,
    /// Use prepared statements.
    pub use_prepared_statements: bool,
}

/// Database URL taken from an environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseUrl {
    /// Variable name.
    pub from_env: String,
}

/// Pool tuning as written to the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettingsEntry {
    /// Maximum lifetime of a connection in seconds.
    pub connection_lifetime: u32,
    /// Idle timeout in seconds.
    pub idle_timeout: u32,
    /// Pool size.
    pub max_connections: u32,
    /// Connection retries.
    pub retries: u32,
}

impl From<&SourceSettings> for SourceConfiguration {
    fn from(settings: &SourceSettings) -> Self {
        Self {
            connection_info: ConnectionInfo {
                database_url: DatabaseUrl {
                    from_env: settings.database_url_env.clone(),
                },
                isolation_level: settings.isolation_level.clone(),
                pool_settings: PoolSettingsEntry {
                    connection_lifetime: settings.pool.connection_lifetime,
                    idle_timeout: settings.pool.idle_timeout,
                    max_connections: settings.pool.max_connections,
                    retries: settings.pool.retries,
                },
                use_prepared_statements: settings.use_prepared_statements,
            },
        }
    }
}

// ── Tables and relationships ────────────────────────────────────────

/// Schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedTable {
    /// Table name.
    pub name: String,
    /// Schema name.
    #[serde(default = "default_schema")]
    pub schema: String,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

impl QualifiedTable {
    /// Qualify `name` with `schema`.
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
        }
    }
}

/// One tracked table with its relationships and permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Table identity.
    pub table: QualifiedTable,
    /// Engine treats the table as an enum.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_enum: bool,
    /// Object (to-one) relationships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_relationships: Vec<Relationship>,
    /// Array (to-many) relationships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array_relationships: Vec<Relationship>,
    /// Role permissions.
    #[serde(flatten)]
    pub permissions: PermissionDocument,
}

impl TableEntry {
    /// An entry with no relationships and no permissions.
    pub fn new(table: QualifiedTable) -> Self {
        Self {
            table,
            is_enum: false,
            object_relationships: Vec::new(),
            array_relationships: Vec::new(),
            permissions: PermissionDocument::default(),
        }
    }
}

/// A named relationship backed by a foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Field name the engine exposes.
    pub name: String,
    /// Constraint the relationship follows.
    pub using: RelationshipUsing,
}

/// Constraint reference of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipUsing {
    /// Local column or remote column of the constraint.
    pub foreign_key_constraint_on: ForeignKeyOn,
}

/// Side of the foreign-key constraint a relationship uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForeignKeyOn {
    /// Column on the table owning the relationship.
    Column(String),
    /// Column on another table pointing back here.
    Remote {
        /// Referencing column.
        column: String,
        /// Referencing table.
        table: QualifiedTable,
    },
}

impl Relationship {
    /// Relationship through a local foreign-key column.
    pub fn local(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            using: RelationshipUsing {
                foreign_key_constraint_on: ForeignKeyOn::Column(column.into()),
            },
        }
    }

    /// Relationship through a foreign-key column on `table`.
    pub fn remote(name: impl Into<String>, column: impl Into<String>, table: QualifiedTable) -> Self {
        Self {
            name: name.into(),
            using: RelationshipUsing {
                foreign_key_constraint_on: ForeignKeyOn::Remote {
                    column: column.into(),
                    table,
                },
            },
        }
    }
}

// ── Permissions ─────────────────────────────────────────────────────

/// The four permission lists of one table, each in role order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionDocument {
    /// Read permissions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select_permissions: Vec<SelectPermissionEntry>,
    /// Insert permissions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insert_permissions: Vec<InsertPermissionEntry>,
    /// Update permissions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update_permissions: Vec<UpdatePermissionEntry>,
    /// Delete permissions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_permissions: Vec<DeletePermissionEntry>,
}

impl PermissionDocument {
    /// True when no list holds an entry.
    pub fn is_empty(&self) -> bool {
        self.select_permissions.is_empty()
            && self.insert_permissions.is_empty()
            && self.update_permissions.is_empty()
            && self.delete_permissions.is_empty()
    }
}

/// `{role, permission: {filter, columns, allow_aggregations}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectPermissionEntry {
    /// Role granted.
    pub role: String,
    /// Grant details.
    pub permission: SelectPermission,
    /// Free-text comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Select grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectPermission {
    /// Row filter.
    pub filter: Filter,
    /// Readable columns.
    pub columns: Vec<String>,
    /// Aggregate queries allowed.
    #[serde(default)]
    pub allow_aggregations: bool,
}

/// `{role, permission: {check, columns, set}, backend_only}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertPermissionEntry {
    /// Role granted.
    pub role: String,
    /// Grant details.
    pub permission: InsertPermission,
    /// Only callable with admin secret.
    #[serde(default)]
    pub backend_only: bool,
}

/// Insert grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertPermission {
    /// Check every inserted row must satisfy.
    pub check: Filter,
    /// Writable columns.
    pub columns: Vec<String>,
    /// Preset column values.
    #[serde(default)]
    pub set: IndexMap<String, Value>,
}

/// `{role, permission: {filter, check, columns, set}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePermissionEntry {
    /// Role granted.
    pub role: String,
    /// Grant details.
    pub permission: UpdatePermission,
}

/// Update grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePermission {
    /// Rows that may be updated.
    pub filter: Filter,
    /// Post-update check.
    pub check: Filter,
    /// Writable columns.
    pub columns: Vec<String>,
    /// Preset column values.
    #[serde(default)]
    pub set: IndexMap<String, Value>,
}

/// `{role, permission: {filter}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePermissionEntry {
    /// Role granted.
    pub role: String,
    /// Grant details.
    pub permission: DeletePermission,
}

/// Delete grant. Row-granular, so it has no columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePermission {
    /// Rows that may be deleted.
    pub filter: Filter,
}

// ── Registered views and functions ──────────────────────────────────

/// A database view tracked with hand-written select permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedView {
    /// View identity.
    pub table: QualifiedTable,
    /// Select grants, passed through as declared.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select_permissions: Vec<SelectPermissionEntry>,
}

impl From<TrackedView> for TableEntry {
    fn from(view: TrackedView) -> Self {
        let mut entry = TableEntry::new(view.table);
        entry.permissions.select_permissions = view.select_permissions;
        entry
    }
}

/// Schema-qualified function name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedFunction {
    /// Function name.
    pub name: String,
    /// Schema name.
    #[serde(default = "default_schema")]
    pub schema: String,
}

/// A tracked SQL function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedFunction {
    /// Function identity.
    pub function: QualifiedFunction,
    /// Engine configuration (custom root fields, session argument), passed through.
    #[serde(default = "empty_object")]
    pub configuration: Value,
    /// Roles allowed to call the function.
    #[serde(default)]
    pub permissions: Vec<FunctionPermission>,
}

/// Role allowed to call a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPermission {
    /// Role name.
    pub role: String,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
