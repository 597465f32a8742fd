use std::path::{Path, PathBuf};

use crate::consts::{APP_NAME, DOWNLOADS_DIR_NAME, DOWNLOADS_ENV};
use crate::util::hash::ConfigId;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE").map(PathBuf::from).unwrap_or_else(|_| std::env::temp_dir())
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/"))
}

/// Directory that remote sources are downloaded into.
///
/// `$ASSETGEN_DOWNLOADS_DIRECTORY` wins, otherwise `~/.assetgen`.
pub fn downloads_dir() -> PathBuf {
  std::env::var(DOWNLOADS_ENV)
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(DOWNLOADS_DIR_NAME))
}

/// Default root for per-config data directories.
pub fn default_data_root() -> PathBuf {
  std::env::temp_dir()
}

/// Per-config data directory holding the lock file and the durable record.
pub fn config_data_dir(data_root: &Path, id: &ConfigId) -> PathBuf {
  data_root.join(format!("{}-{}", APP_NAME, id))
}
