//! Test utilities for assetgen-lib.
//!
//! Helpers for laying out scratch source trees, pinning modification times and
//! standing in for external format compilers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;

use crate::asset::ToolRunner;
use crate::config::OutputSettings;
use crate::engine::Phase;
use crate::engine::emit::{BuildContext, Ledger};

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
  path
}

/// Pin a file's modification time.
pub fn set_mtime(path: &Path, when: SystemTime) {
  filetime::set_file_mtime(path, FileTime::from_system_time(when)).unwrap();
}

/// Set a file's modification time `secs` seconds into the past.
pub fn backdate(path: &Path, secs: u64) {
  set_mtime(path, SystemTime::now() - Duration::from_secs(secs));
}

/// Set a file's modification time `secs` seconds into the future.
pub fn postdate(path: &Path, secs: u64) {
  set_mtime(path, SystemTime::now() + Duration::from_secs(secs));
}

/// Write an executable shell script named `name` into `bin_dir`.
#[cfg(unix)]
pub fn fake_tool(bin_dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  std::fs::create_dir_all(bin_dir).unwrap();
  let path = bin_dir.join(name);
  std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  let mut perms = std::fs::metadata(&path).unwrap().permissions();
  perms.set_mode(0o755);
  std::fs::set_permissions(&path, perms).unwrap();
  path
}

/// A scratch config directory with an output directory and an empty ledger,
/// for driving handlers and the sink directly.
pub struct Harness {
  pub root: TempDir,
  pub output: OutputSettings,
  pub tools: ToolRunner,
  pub ledger: Ledger,
}

impl Harness {
  pub fn new(hashed: bool) -> Self {
    Self::with_env(hashed, BTreeMap::new())
  }

  pub fn with_env(hashed: bool, env: BTreeMap<String, String>) -> Self {
    let root = TempDir::new().unwrap();
    let output = OutputSettings {
      directory: root.path().join("out"),
      template: "{hash}-{filename}".to_string(),
      hashed,
      manifest: None,
      manifest_force: false,
    };
    let tools = ToolRunner::new(env, root.path().to_path_buf());
    Self {
      root,
      output,
      tools,
      ledger: Ledger::default(),
    }
  }

  /// Harness whose tools resolve from `<root>/bin` first.
  #[cfg(unix)]
  pub fn with_bin(hashed: bool) -> Self {
    let mut harness = Self::new(hashed);
    let path = format!("{}:/usr/bin:/bin", harness.bin().display());
    harness.tools = ToolRunner::new(
      BTreeMap::from([("PATH".to_string(), path)]),
      harness.root.path().to_path_buf(),
    );
    harness
  }

  pub fn base(&self) -> &Path {
    self.root.path()
  }

  pub fn bin(&self) -> PathBuf {
    self.root.path().join("bin")
  }

  pub fn out_dir(&self) -> &Path {
    &self.output.directory
  }

  pub fn ctx<'a>(&'a mut self, phase: Phase, key: &'a str) -> BuildContext<'a> {
    BuildContext::new(phase, key, self.root.path(), &self.output, &self.tools, &mut self.ledger)
  }

  /// Contents of a file below the output directory, as text.
  pub fn read_output(&self, relative: &str) -> String {
    std::fs::read_to_string(self.output.directory.join(relative)).unwrap()
  }
}
