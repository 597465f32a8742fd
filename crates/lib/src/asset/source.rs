use std::path::{Path, PathBuf};

use super::GenerateError;

/// One input of an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
  /// A file, absolute or relative to the config directory.
  File(PathBuf),
  /// Inline text. Never stale and never a dependency.
  Raw(String),
}

impl Source {
  /// The file path, if this is a file source.
  pub fn path(&self) -> Option<&Path> {
    match self {
      Source::File(path) => Some(path),
      Source::Raw(_) => None,
    }
  }

  /// Whether this is a file source with the given extension (without the dot).
  pub fn has_extension(&self, ext: &str) -> bool {
    self
      .path()
      .and_then(Path::extension)
      .is_some_and(|e| e.eq_ignore_ascii_case(ext))
  }

  /// Raw bytes of the source, untransformed.
  pub fn read(&self) -> Result<Vec<u8>, GenerateError> {
    match self {
      Source::Raw(text) => Ok(text.as_bytes().to_vec()),
      Source::File(path) => read_file(path),
    }
  }
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, GenerateError> {
  std::fs::read(path).map_err(|source| GenerateError::Read {
    path: path.to_path_buf(),
    source,
  })
}
