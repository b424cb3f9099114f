/// Registry documents and validated generation projects.
pub mod document;
/// Entity, field and relation declarations.
pub mod entity;
/// Default storage names for tables, columns and reverse accessors.
pub mod names;
/// Explicit entity registration and reverse-relation lookup.
pub mod registry;
