/// Permission document assembly with per-entity memoization.
pub mod assembler;
/// Top-level export document built from a validated project.
pub mod manifest;
/// Hasura metadata (format version 3) structs.
pub mod metadata;
/// Object/array relationship classification and many-to-many join synthesis.
pub mod relationships;
