use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};
use crate::generator::metadata::HasuraMetadata;

/// Serialize `metadata` and replace `path` with it.
///
/// The document is fully serialized before the filesystem is touched, and the
/// target only changes through a rename, so a failed run leaves any previous
/// manifest in place.
pub fn write_manifest(path: &Path, metadata: &HasuraMetadata, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(metadata)?
    } else {
        serde_json::to_string(metadata)?
    };
    write_atomic(path, json.as_bytes())?;
    info!(path = %path.display(), "manifest exported");
    Ok(())
}

/// Write a Markdown report to `path`.
pub fn write_report(path: &Path, report: &str) -> Result<()> {
    write_atomic(path, report.as_bytes())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let mut file = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    file.write_all(contents).map_err(|e| Error::io(path, e))?;
    file.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
