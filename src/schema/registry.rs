use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::ConfigError;

use super::entity::{EntityDef, EntityKind, FieldDef, RelationKind};
use super::names;

/// The reverse side of a foreign-key or one-to-one field, seen from its target.
#[derive(Debug, Clone, Copy)]
pub struct InverseRelation<'a> {
    /// Entity declaring the forward field.
    pub source: &'a EntityDef,
    /// The forward field.
    pub field: &'a FieldDef,
    /// Multiplicity of the forward field.
    pub kind: RelationKind,
}

impl InverseRelation<'_> {
    /// Name the reverse accessor actually gets: the configured related name or
    /// the conventional default.
    pub fn accessor_name(&self) -> String {
        self.configured_name()
            .map(ToString::to_string)
            .unwrap_or_else(|| match self.kind {
                RelationKind::OneToOne => names::default_one_to_one_accessor(&self.source.name),
                _ => names::default_set_accessor(&self.source.name),
            })
    }

    /// The related name configured on the forward field.
    pub fn configured_name(&self) -> Option<&str> {
        self.field
            .relation
            .as_ref()
            .and_then(|r| r.related_name.as_deref())
    }

    /// True when the forward field opted out of a reverse accessor.
    pub fn is_hidden(&self) -> bool {
        self.configured_name()
            .is_some_and(names::is_hidden_related_name)
    }
}

/// Entity definitions, populated by explicit registration.
///
/// Registration order is preserved and drives the order of generated tables.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: IndexMap<String, EntityDef>,
}

impl EntityRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one entity.
    ///
    /// Concrete entities without a primary-key field receive an implicit `id`
    /// primary key in front of their declared fields.
    pub fn register(&mut self, mut entity: EntityDef) -> Result<(), ConfigError> {
        if self.entities.contains_key(&entity.name) {
            return Err(ConfigError::DuplicateEntity {
                entity: entity.name,
            });
        }

        let mut seen = HashSet::new();
        for field in &entity.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    entity: entity.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        if !entity.is_abstract && !entity.has_primary_key() && !seen.contains("id") {
            debug!(entity = %entity.name, "adding implicit id primary key");
            entity.fields.insert(0, FieldDef::new("id").primary_key());
        }

        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    /// Register several entities in order.
    pub fn register_all(
        &mut self,
        entities: impl IntoIterator<Item = EntityDef>,
    ) -> Result<(), ConfigError> {
        entities.into_iter().try_for_each(|e| self.register(e))
    }

    /// Check every cross-entity reference. Call once registration is complete.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut extensions: IndexMap<&str, &str> = IndexMap::new();

        for entity in self.entities.values() {
            for field in &entity.fields {
                if let Some(relation) = &field.relation {
                    if !self.entities.contains_key(&relation.to) {
                        return Err(ConfigError::UnknownEntity {
                            entity: entity.name.clone(),
                            target: relation.to.clone(),
                        });
                    }
                }
            }

            if let EntityKind::ExtendedEnum(base) = &entity.kind {
                let Some(target) = self.entities.get(base) else {
                    return Err(ConfigError::UnknownEntity {
                        entity: entity.name.clone(),
                        target: base.clone(),
                    });
                };
                if !target.is_enum() {
                    return Err(ConfigError::ExtendedEnumTarget {
                        entity: entity.name.clone(),
                        target: base.clone(),
                    });
                }
                if let Some(first) = extensions.insert(base.as_str(), entity.name.as_str()) {
                    return Err(ConfigError::ExtendedEnumTwice {
                        target: base.clone(),
                        first: first.to_string(),
                        second: entity.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look an entity up by name.
    pub fn get(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// All entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.values()
    }

    /// Non-abstract entities in registration order.
    pub fn concrete(&self) -> impl Iterator<Item = &EntityDef> {
        self.iter().filter(|e| !e.is_abstract)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The extended-enum companion of enum entity `name`.
    pub fn extension_of(&self, name: &str) -> Option<&EntityDef> {
        self.iter()
            .find(|e| matches!(&e.kind, EntityKind::ExtendedEnum(base) if base == name))
    }

    /// Foreign-key and one-to-one fields of concrete entities pointing at `target`,
    /// in registration order then field-declaration order.
    pub fn inverse_relations<'a>(
        &'a self,
        target: &'a str,
    ) -> impl Iterator<Item = InverseRelation<'a>> + 'a {
        self.concrete().flat_map(move |source| {
            source.fields.iter().filter_map(move |field| {
                let relation = field.relation.as_ref()?;
                match relation.kind {
                    RelationKind::ForeignKey | RelationKind::OneToOne if relation.to == target => {
                        Some(InverseRelation {
                            source,
                            field,
                            kind: relation.kind,
                        })
                    }
                    _ => None,
                }
            })
        })
    }
}
