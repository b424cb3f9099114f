use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::permissions::roles::OverlayRoles;

/// File name of the exported manifest inside the `hasura` directory.
pub const DEFAULT_MANIFEST_FILE: &str = "hasura_metadata_exported.json";

/// Generation settings, read from the `settings` block of a registry document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Project base directory; the default export path is derived from it.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Names of the pre-/post-authentication overlay roles.
    #[serde(default)]
    pub overlay_roles: OverlayRoles,
    /// Database source the manifest describes.
    #[serde(default)]
    pub source: SourceSettings,
}

impl Settings {
    /// `<base_dir>/../hasura/hasura_metadata_exported.json`.
    ///
    /// A relative `base_dir` is taken relative to `registry_dir`, the directory of
    /// the registry document, which also stands in for an unset `base_dir`.
    pub fn default_export_path(&self, registry_dir: &Path) -> PathBuf {
        let base = match &self.base_dir {
            Some(dir) => registry_dir.join(dir),
            None => registry_dir.to_path_buf(),
        };
        base.join("..")
            .join("hasura")
            .join(DEFAULT_MANIFEST_FILE)
    }
}

/// Connection settings of the single database source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Source name.
    pub name: String,
    /// Backend kind.
    pub kind: String,
    /// Environment variable holding the database URL.
    pub database_url_env: String,
    /// Transaction isolation level.
    pub isolation_level: String,
    /// Connection pool tuning.
    pub pool: PoolSettings,
    /// Use prepared statements.
    pub use_prepared_statements: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            kind: "postgres".to_string(),
            database_url_env: "HASURA_GRAPHQL_DATABASE_URL".to_string(),
            isolation_level: "read-committed".to_string(),
            pool: PoolSettings::default(),
            use_prepared_statements: true,
        }
    }
}

/// Connection pool tuning, in seconds where applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Maximum lifetime of a connection.
    pub connection_lifetime: u32,
    /// Idle time before a connection is closed.
    pub idle_timeout: u32,
    /// Pool size.
    pub max_connections: u32,
    /// Connection retries.
    pub retries: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            connection_lifetime: 600,
            idle_timeout: 180,
            max_connections: 50,
            retries: 1,
        }
    }
}
