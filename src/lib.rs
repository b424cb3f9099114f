//! Resolve role-inherited field and table permissions of registered entities into a
//! Hasura metadata manifest.
//!
//! The pipeline is: decode a registry document into a [`schema::document::Project`],
//! flatten the role tree, assemble one permission document per entity, classify the
//! relationship graph, and write the resulting [`generator::metadata::HasuraMetadata`].
#![warn(missing_docs)]

/// Generation settings read from the registry document.
pub mod config;
/// Fatal error types.
pub mod error;
/// Permission assembly, relationship classification and manifest building.
pub mod generator;
/// Subscriber setup for the binary.
pub mod logging;
/// Manifest and report output.
pub mod output;
/// Action codes, the role hierarchy and the field/table resolvers.
pub mod permissions;
/// Entity declarations, naming conventions and the entity registry.
pub mod schema;

pub use error::{ConfigError, Error, Result};
