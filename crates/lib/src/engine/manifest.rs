use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::BuildError;

/// Replaces the manifest file with the logical to versioned path mapping.
///
/// The content goes to a sibling `.tmp` file first and is renamed over the
/// manifest, so readers never see a partial file.
pub fn write_manifest(path: &Path, manifest: &BTreeMap<String, String>) -> Result<(), BuildError> {
  let io_err = |source| BuildError::Manifest {
    path: path.to_path_buf(),
    source,
  };

  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(io_err)?;
  }
  let mut content = serde_json::to_string_pretty(manifest).map_err(|e| io_err(std::io::Error::other(e)))?;
  content.push('\n');

  let temp_path = temp_path(path);
  fs::write(&temp_path, content).map_err(io_err)?;
  fs::rename(&temp_path, path).map_err(io_err)
}

fn temp_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(OsString::from).unwrap_or_default();
  name.push(".tmp");
  path.with_file_name(name)
}

/// Reads a manifest file back. Used by tests and tooling.
pub fn read_manifest(path: &Path) -> Option<BTreeMap<String, String>> {
  let content = fs::read_to_string(path).ok()?;
  serde_json::from_str(&content).ok()
}
