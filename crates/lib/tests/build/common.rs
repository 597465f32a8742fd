//! Shared fixtures for engine integration tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, SystemTime};

use assetgen_lib::engine::manifest::read_manifest;
use assetgen_lib::fetch::FetchError;
use assetgen_lib::{BuildError, Engine, EngineOptions, Fetcher, HandlerRegistry};
use filetime::FileTime;
use tempfile::TempDir;

/// Fetcher for projects that never reference remote sources.
pub struct Offline;

impl Fetcher for Offline {
  fn fetch(&self, url: &str) -> Result<PathBuf, FetchError> {
    Err(FetchError::InvalidUrl(url.to_string()))
  }
}

/// A scratch project: a config directory plus a private data root.
///
/// Everything written through the helpers is backdated so that outputs
/// generated during the test are always strictly newer than their inputs.
pub struct Project {
  pub root: TempDir,
  pub data: TempDir,
  pub force: bool,
  pub interrupt: Option<Arc<AtomicBool>>,
}

impl Project {
  pub fn new(config: &str) -> Self {
    let project = Self {
      root: TempDir::new().unwrap(),
      data: TempDir::new().unwrap(),
      force: false,
      interrupt: None,
    };
    project.write_config(config);
    set_mtime(&project.config_path(), -1000);
    project
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.root.path().join(relative)
  }

  pub fn config_path(&self) -> PathBuf {
    self.path("assetgen.yaml")
  }

  pub fn write_config(&self, config: &str) {
    std::fs::write(self.config_path(), config).unwrap();
  }

  /// Writes a source file dated in the past.
  pub fn source(&self, relative: &str, content: &str) -> PathBuf {
    let path = self.path(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    set_mtime(&path, -500);
    path
  }

  /// Rewrites a source and dates it in the future, so it is newer than any output.
  pub fn edit(&self, relative: &str, content: &str) -> PathBuf {
    let path = self.source(relative, content);
    set_mtime(&path, 60);
    path
  }

  /// Bumps a file's mtime into the future without touching its content.
  pub fn touch(&self, relative: &str, offset_secs: i64) {
    set_mtime(&self.path(relative), offset_secs);
  }

  pub fn options(&self) -> EngineOptions {
    EngineOptions {
      profile: "default".to_string(),
      force: self.force,
      data_root: self.data.path().to_path_buf(),
      interrupt: self.interrupt.clone(),
    }
  }

  pub fn open(&self) -> Result<Engine, BuildError> {
    self.open_at(&self.config_path())
  }

  pub fn open_at(&self, config: &Path) -> Result<Engine, BuildError> {
    Engine::open(config, &self.options(), &HandlerRegistry::with_builtins(), &Offline)
  }

  pub fn read(&self, relative: &str) -> String {
    std::fs::read_to_string(self.path(relative)).unwrap()
  }

  pub fn manifest(&self, relative: &str) -> BTreeMap<String, String> {
    read_manifest(&self.path(relative)).unwrap()
  }

  /// Files under `relative`, as sorted paths relative to it.
  pub fn files_under(&self, relative: &str) -> Vec<String> {
    let root = self.path(relative);
    let mut files: Vec<String> = walkdir::WalkDir::new(&root)
      .into_iter()
      .filter_map(Result::ok)
      .filter(|e| e.file_type().is_file())
      .map(|e| {
        e.path()
          .strip_prefix(&root)
          .unwrap()
          .to_string_lossy()
          .replace('\\', "/")
      })
      .collect();
    files.sort();
    files
  }
}

pub fn set_mtime(path: &Path, offset_secs: i64) {
  let now = SystemTime::now();
  let when = if offset_secs < 0 {
    now - Duration::from_secs(offset_secs.unsigned_abs())
  } else {
    now + Duration::from_secs(offset_secs as u64)
  };
  filetime::set_file_mtime(path, FileTime::from_system_time(when)).unwrap();
}

pub fn mtime(path: &Path) -> SystemTime {
  std::fs::metadata(path).unwrap().modified().unwrap()
}

pub fn sha256_hex(content: &[u8]) -> String {
  assetgen_lib::util::hash::hash_bytes(content).0
}
