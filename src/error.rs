use std::path::PathBuf;

use thiserror::Error;

/// Invalid role hierarchy or entity declaration. Always aborts the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A parent list names a role that is not declared in the permission tree.
    #[error("reference '{parent}' from permission tree (parent of '{role}') does not exist")]
    UnknownParentRole {
        /// Role whose parent list holds the dangling reference.
        role: String,
        /// The undeclared parent.
        parent: String,
    },
    /// Walking the parents of a role led back to the role itself.
    #[error("circular reference '{role}' in permission tree")]
    CircularReference {
        /// Role that reaches itself.
        role: String,
    },
    /// A role was queried that the permission tree does not declare.
    #[error("role '{role}' is not declared in the permission tree")]
    UnknownRole {
        /// The undeclared role.
        role: String,
    },
    /// Overlay roles live outside the inheritance tree.
    #[error("overlay role '{role}' must not be declared in the permission tree")]
    OverlayRoleInHierarchy {
        /// The offending overlay role.
        role: String,
    },
    /// A field action code is not a valid `{i,-}{s,-}{u,-}` triple.
    #[error("invalid action code '{code}': {reason}")]
    InvalidActionCode {
        /// The rejected code.
        code: String,
        /// Which position or length check failed.
        reason: String,
    },
    /// A preset action string is not one of `i-`, `-u` or `iu`.
    #[error("invalid preset actions '{actions}' (expected 'i-', '-u' or 'iu')")]
    InvalidPresetActions {
        /// The rejected action string.
        actions: String,
    },
    /// Two entities were registered under the same name.
    #[error("entity '{entity}' is registered twice")]
    DuplicateEntity {
        /// Name registered more than once.
        entity: String,
    },
    /// A relation or extended-enum link points at an entity nobody registered.
    #[error("entity '{entity}' references unknown entity '{target}'")]
    UnknownEntity {
        /// Entity holding the reference.
        entity: String,
        /// Missing target.
        target: String,
    },
    /// An extended enum must extend an enum entity.
    #[error("extended enum '{entity}' links to '{target}', which is not an enum")]
    ExtendedEnumTarget {
        /// The extended enum entity.
        entity: String,
        /// The non-enum target.
        target: String,
    },
    /// An enum entity may be extended by at most one entity.
    #[error("enum '{target}' is extended by both '{first}' and '{second}'")]
    ExtendedEnumTwice {
        /// The enum entity.
        target: String,
        /// First extending entity.
        first: String,
        /// Second extending entity.
        second: String,
    },
    /// Two fields of one entity share a name.
    #[error("field '{field}' is declared twice on entity '{entity}'")]
    DuplicateField {
        /// Entity with the duplicate.
        entity: String,
        /// Duplicated field name.
        field: String,
    },
}

/// Top-level failure of a generation run.
#[derive(Debug, Error)]
pub enum Error {
    /// Role hierarchy or registry declaration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The registry document could not be decoded, or the manifest could not be encoded.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Reading the registry or writing an artifact failed.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
