//! Relationship graph of the tracked tables.
//!
//! Object relationships list many-to-one fields, then forward one-to-one fields, then
//! inverse one-to-one links, each group in declaration order. Array relationships list
//! the inverse side of foreign keys. Many-to-many fields are synthesized into join
//! tables in a second pass.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::schema::entity::{EntityDef, FieldDef, RelationKind};
use crate::schema::names;
use crate::schema::registry::{EntityRegistry, InverseRelation};

use super::metadata::{QualifiedTable, Relationship, TableEntry};

/// Relationships of one table, ready for its manifest entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRelationships {
    /// To-one relationships.
    pub object_relationships: Vec<Relationship>,
    /// To-many relationships.
    pub array_relationships: Vec<Relationship>,
}

impl EntityRelationships {
    /// Push unless a relationship of the same name already exists on the table.
    fn push(&mut self, table: &str, kind: ListKind, relationship: Relationship) {
        let taken = self
            .object_relationships
            .iter()
            .chain(&self.array_relationships)
            .any(|r| r.name == relationship.name);
        if taken {
            warn!(table, name = %relationship.name, "duplicate relationship name; skipped");
            return;
        }
        match kind {
            ListKind::Object => self.object_relationships.push(relationship),
            ListKind::Array => self.array_relationships.push(relationship),
        }
    }
}

#[derive(Clone, Copy)]
enum ListKind {
    Object,
    Array,
}

/// Schema-qualified storage table of `entity`.
pub fn qualified_table(entity: &EntityDef) -> QualifiedTable {
    QualifiedTable::new(entity.table_name(), entity.schema_name())
}

/// Classify the relationships of a concrete entity.
pub fn classify(entity: &EntityDef, registry: &EntityRegistry) -> EntityRelationships {
    let table = entity.table_name();
    let mut out = EntityRelationships::default();

    if entity.is_enum() {
        debug!(entity = %entity.name, "enum entity; object relationships suppressed");
    } else {
        for kind in [RelationKind::ForeignKey, RelationKind::OneToOne] {
            for field in entity.relation_fields(kind) {
                let column = local_column(field);
                out.push(&table, ListKind::Object, Relationship::local(&field.name, column));
            }
        }

        for inverse in registry
            .inverse_relations(&entity.name)
            .filter(|r| r.kind == RelationKind::OneToOne)
        {
            if let Some(rel) = inverse_relationship(&inverse) {
                out.push(&table, ListKind::Object, rel);
            }
        }
    }

    for inverse in registry
        .inverse_relations(&entity.name)
        .filter(|r| r.kind == RelationKind::ForeignKey)
    {
        if let Some(rel) = inverse_relationship(&inverse) {
            out.push(&table, ListKind::Array, rel);
        }
    }

    out
}

fn local_column(field: &FieldDef) -> String {
    field
        .column_name()
        .unwrap_or_else(|| names::default_fk_column(&field.name))
}

/// Remote-form relationship for the reverse side of `inverse`.
fn inverse_relationship(inverse: &InverseRelation<'_>) -> Option<Relationship> {
    if inverse.is_hidden() {
        debug!(
            source = %inverse.source.name,
            field = %inverse.field.name,
            "reverse accessor hidden"
        );
        return None;
    }
    if inverse.configured_name().is_none() {
        warn!(
            source = %inverse.source.name,
            field = %inverse.field.name,
            accessor = %inverse.accessor_name(),
            "related name not provided; using default accessor"
        );
    }
    Some(Relationship::remote(
        inverse.accessor_name(),
        local_column(inverse.field),
        qualified_table(inverse.source),
    ))
}

/// An implicit join table backing one many-to-many field.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinTable {
    /// Synthesized entity (`<Source>.<field>`) whose permissions the join table gets.
    pub entity: EntityDef,
    /// Join table identity.
    pub table: QualifiedTable,
    /// Table of the declaring entity.
    pub source_table: QualifiedTable,
    /// Table of the target entity.
    pub target_table: QualifiedTable,
    /// Column referencing the source.
    pub source_column: String,
    /// Column referencing the target.
    pub target_column: String,
    /// Object relationship names on the join table, `(source, target)`.
    pub relationship_names: (String, String),
    /// Array relationship added to the source table.
    pub source_accessor: String,
    /// Array relationship added to the target table; `None` when hidden.
    pub target_accessor: Option<String>,
}

impl JoinTable {
    fn synthesize(source: &EntityDef, field: &FieldDef, target: &EntityDef) -> Option<Self> {
        let relation = field.relation.as_ref()?;
        let through = relation.through.clone().unwrap_or_default();

        let source_table = qualified_table(source);
        let table = QualifiedTable::new(
            through
                .table
                .clone()
                .unwrap_or_else(|| names::join_table_name(&source_table.name, &field.name)),
            source.schema_name(),
        );
        let (source_column, target_column) = names::join_columns(&source.name, &target.name);

        let column = |name: &str| {
            let mut def = FieldDef::new(name);
            def.permissions = through.field_permissions.clone();
            def
        };
        let mut entity = EntityDef::new(format!("{}.{}", source.name, field.name))
            .app_label(&source.app_label)
            .table(&table.name)
            .field(FieldDef::new("id").primary_key())
            .field(column(&source_column))
            .field(column(&target_column));
        entity.schema = Some(table.schema.clone());
        entity.permissions = through.permissions;

        let target_accessor = match relation.related_name.as_deref() {
            Some(name) if names::is_hidden_related_name(name) => None,
            Some(name) => Some(name.to_string()),
            None => Some(names::default_set_accessor(&source.name)),
        };

        Some(Self {
            entity,
            table,
            source_table,
            target_table: qualified_table(target),
            source_column,
            target_column,
            relationship_names: names::join_relationship_names(&source.name, &target.name),
            source_accessor: field.name.clone(),
            target_accessor,
        })
    }

    /// Manifest entry of the join table itself, without permissions.
    pub fn table_entry(&self) -> TableEntry {
        let mut entry = TableEntry::new(self.table.clone());
        let (source_name, target_name) = &self.relationship_names;
        entry.object_relationships = vec![
            Relationship::local(source_name, &self.source_column),
            Relationship::local(target_name, &self.target_column),
        ];
        entry
    }
}

/// Join tables of every many-to-many field, in registration then declaration order.
pub fn many_to_many_joins(registry: &EntityRegistry) -> Vec<JoinTable> {
    registry
        .concrete()
        .flat_map(|source| {
            source
                .relation_fields(RelationKind::ManyToMany)
                .map(move |field| (source, field))
        })
        .filter_map(|(source, field)| {
            let target = registry.get(&field.relation.as_ref()?.to)?;
            JoinTable::synthesize(source, field, target)
        })
        .collect()
}

/// Append `join` and its back-references to `tables`.
///
/// Running twice is a no-op apart from a warning. An endpoint whose table is not in
/// `tables` is left without its back-reference.
pub fn attach_many_to_many(tables: &mut Vec<TableEntry>, join: &JoinTable, entry: TableEntry) {
    if tables.iter().any(|t| t.table == join.table) {
        warn!(table = %join.table.name, "join table already attached; skipped");
        return;
    }

    let source = Relationship::remote(
        &join.source_accessor,
        &join.source_column,
        join.table.clone(),
    );
    push_array(tables, &join.source_table, source);

    if let Some(accessor) = &join.target_accessor {
        let target = Relationship::remote(accessor, &join.target_column, join.table.clone());
        push_array(tables, &join.target_table, target);
    }

    tables.push(entry);
}

fn push_array(tables: &mut [TableEntry], endpoint: &QualifiedTable, relationship: Relationship) {
    let Some(entry) = tables.iter_mut().find(|t| &t.table == endpoint) else {
        return;
    };
    let names: HashSet<&str> = entry
        .object_relationships
        .iter()
        .chain(&entry.array_relationships)
        .map(|r| r.name.as_str())
        .collect();
    if names.contains(relationship.name.as_str()) {
        warn!(
            table = %endpoint.name,
            name = %relationship.name,
            "relationship already present; skipped"
        );
        return;
    }
    entry.array_relationships.push(relationship);
}
