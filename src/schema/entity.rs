use serde::{Deserialize, Serialize};

use crate::permissions::field::{FieldPermissions, FieldPresets};
use crate::permissions::table::TablePermissions;

use super::names;

/// How the downstream engine should treat an entity's table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Ordinary table.
    #[default]
    Regular,
    /// Lookup table of fixed values. Never references other entities.
    Enum,
    /// Companion table carrying extra columns for the named enum entity (1:1 link).
    ExtendedEnum(String),
}

/// Multiplicity of a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Many rows of this entity point at one target row.
    ForeignKey,
    /// At most one row of this entity points at one target row.
    OneToOne,
    /// Rows on both sides are linked through an implicit join table.
    ManyToMany,
}

/// Join-table options of a many-to-many relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThroughConfig {
    /// Storage name of the join table; defaults to `<source table>_<field>`.
    #[serde(default)]
    pub table: Option<String>,
    /// Table filters of the join table.
    #[serde(default)]
    pub permissions: Option<TablePermissions>,
    /// Action codes applied to every join-table column.
    #[serde(default)]
    pub field_permissions: Option<FieldPermissions>,
}

/// A relation declared on a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Multiplicity.
    pub kind: RelationKind,
    /// Target entity name.
    pub to: String,
    /// Configured reverse accessor on the target entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_name: Option<String>,
    /// Many-to-many join-table options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<ThroughConfig>,
}

/// One declared field of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Logical field name.
    pub name: String,
    /// Explicit storage column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Relation carried by this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationDef>,
    /// Per-role action codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<FieldPermissions>,
    /// Per-role preset values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<FieldPresets>,
    /// Documentation text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    /// A plain column named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
            primary_key: false,
            relation: None,
            permissions: None,
            presets: None,
            description: None,
        }
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Override the storage column.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Attach a relation of `kind` to entity `to`.
    pub fn relation(mut self, kind: RelationKind, to: impl Into<String>) -> Self {
        self.relation = Some(RelationDef {
            kind,
            to: to.into(),
            related_name: None,
            through: None,
        });
        self
    }

    /// Configure the reverse accessor of the attached relation.
    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        if let Some(relation) = self.relation.as_mut() {
            relation.related_name = Some(name.into());
        }
        self
    }

    /// Configure the join table of the attached many-to-many relation.
    pub fn through(mut self, through: ThroughConfig) -> Self {
        if let Some(relation) = self.relation.as_mut() {
            relation.through = Some(through);
        }
        self
    }

    /// Set the per-role action codes.
    pub fn permissions(mut self, permissions: FieldPermissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Set the per-role presets.
    pub fn presets(mut self, presets: FieldPresets) -> Self {
        self.presets = Some(presets);
        self
    }

    /// Relation kind, if the field carries one.
    pub fn relation_kind(&self) -> Option<RelationKind> {
        self.relation.as_ref().map(|r| r.kind)
    }

    /// Many-to-many fields have no column of their own.
    pub fn is_column(&self) -> bool {
        self.relation_kind() != Some(RelationKind::ManyToMany)
    }

    /// Storage column; `None` for many-to-many fields.
    pub fn column_name(&self) -> Option<String> {
        if !self.is_column() {
            return None;
        }
        if let Some(column) = &self.column {
            return Some(column.clone());
        }
        match self.relation_kind() {
            Some(RelationKind::ForeignKey | RelationKind::OneToOne) => {
                Some(names::default_fk_column(&self.name))
            }
            _ => Some(self.name.clone()),
        }
    }
}

/// A registered entity: one storage table plus its declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity (class) name, unique within the registry.
    pub name: String,
    /// Owning application, used for default table names.
    #[serde(default = "default_app_label")]
    pub app_label: String,
    /// Explicit storage table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Explicit storage schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Table classification.
    #[serde(default)]
    pub kind: EntityKind,
    /// Abstract entities have no table and are never emitted.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Table-level filters; `None` means the entity is permission-free.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<TablePermissions>,
    /// Documentation text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_app_label() -> String {
    "app".to_string()
}

impl EntityDef {
    /// A regular entity with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app_label: default_app_label(),
            table: None,
            schema: None,
            kind: EntityKind::Regular,
            is_abstract: false,
            fields: Vec::new(),
            permissions: None,
            description: None,
        }
    }

    /// Set the owning application.
    pub fn app_label(mut self, app_label: impl Into<String>) -> Self {
        self.app_label = app_label.into();
        self
    }

    /// Override the storage table.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the classification.
    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark as abstract.
    pub fn abstract_entity(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Append a field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the table-level filters.
    pub fn permissions(mut self, permissions: TablePermissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Storage table name.
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| names::default_table_name(&self.app_label, &self.name))
    }

    /// Storage schema name.
    pub fn schema_name(&self) -> &str {
        self.schema.as_deref().unwrap_or(names::DEFAULT_SCHEMA)
    }

    /// True for [`EntityKind::Enum`].
    pub fn is_enum(&self) -> bool {
        self.kind == EntityKind::Enum
    }

    /// Look a field up by logical name.
    pub fn field_named(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Storage column of a logical field name.
    pub fn column_of(&self, name: &str) -> Option<String> {
        self.field_named(name).and_then(FieldDef::column_name)
    }

    /// True when some field is marked as primary key.
    pub fn has_primary_key(&self) -> bool {
        self.fields.iter().any(|f| f.primary_key)
    }

    /// Fields carrying a relation of `kind`, in declaration order.
    pub fn relation_fields(&self, kind: RelationKind) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(move |f| f.relation_kind() == Some(kind))
    }
}
