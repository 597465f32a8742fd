//! Timestamp-based freshness.
//!
//! Only modification times are compared; source contents are never hashed. A
//! dependency whose mtime is restored without a content change will not
//! trigger a rebuild. Equal timestamps count as stale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use super::state::BuildState;
use super::types::Phase;

/// Per-run memo of file modification times.
///
/// `None` records a missing or unreadable file.
#[derive(Debug, Default)]
pub struct MtimeCache {
  entries: HashMap<PathBuf, Option<SystemTime>>,
}

impl MtimeCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn mtime(&mut self, path: &Path) -> Option<SystemTime> {
    if let Some(cached) = self.entries.get(path) {
      return *cached;
    }
    let mtime = std::fs::metadata(path).and_then(|m| m.modified()).ok();
    self.entries.insert(path.to_path_buf(), mtime);
    mtime
  }

  /// Drops the memo for a path that was just written or deleted.
  pub fn invalidate(&mut self, path: &Path) {
    self.entries.remove(path);
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  /// Whether `output` must be rebuilt because of `input`.
  ///
  /// True when either file is missing or `input` is at least as new.
  pub fn newer(&mut self, input: &Path, output: &Path) -> bool {
    let Some(output_mtime) = self.mtime(output) else {
      return true;
    };
    match self.mtime(input) {
      Some(input_mtime) => input_mtime >= output_mtime,
      None => true,
    }
  }
}

/// Freshness rules for one phase of a run.
#[derive(Debug)]
pub struct Freshness<'a> {
  pub force: bool,
  pub phase: Phase,
  pub config_path: &'a Path,
  pub base_dir: &'a Path,
  pub output_dir: &'a Path,
}

impl Freshness<'_> {
  /// Whether the asset `key` can be skipped. A stale asset's produced-set is
  /// discarded from `state`.
  pub fn is_fresh(&self, key: &str, depends: &[PathBuf], state: &mut BuildState, mtimes: &mut MtimeCache) -> bool {
    if self.force {
      return false;
    }
    match self.phase {
      Phase::Prereq => self.prereq_fresh(key, depends, state, mtimes),
      Phase::Output => self.output_fresh(key, depends, state, mtimes),
    }
  }

  fn prereq_fresh(&self, key: &str, depends: &[PathBuf], state: &mut BuildState, mtimes: &mut MtimeCache) -> bool {
    let output = self.base_dir.join(key);
    if mtimes.mtime(&output).is_none() {
      debug!(asset = key, "prereq missing");
      state.prereqs.remove(key);
      return false;
    }
    if let Some(dep) = self.stale_input(&output, depends, mtimes) {
      debug!(asset = key, dependency = %dep.display(), "prereq stale");
      state.prereqs.remove(key);
      return false;
    }
    true
  }

  fn output_fresh(&self, key: &str, depends: &[PathBuf], state: &mut BuildState, mtimes: &mut MtimeCache) -> bool {
    let paths: Vec<String> = match state.outputs.get(key) {
      Some(paths) if !paths.is_empty() => paths.iter().cloned().collect(),
      _ => {
        debug!(asset = key, "no record of outputs");
        return false;
      }
    };

    let mut representative = None;
    for path in &paths {
      let full = self.output_dir.join(path);
      if mtimes.mtime(&full).is_none() {
        debug!(asset = key, missing = %path, "output missing");
        state.outputs.remove(key);
        return false;
      }
      representative.get_or_insert(full);
    }

    let Some(representative) = representative else {
      return false;
    };
    if let Some(dep) = self.stale_input(&representative, depends, mtimes) {
      debug!(asset = key, dependency = %dep.display(), "output stale");
      state.outputs.remove(key);
      return false;
    }
    true
  }

  /// First of `depends` or the config file that is at least as new as `output`.
  fn stale_input<'p>(&'p self, output: &Path, depends: &'p [PathBuf], mtimes: &mut MtimeCache) -> Option<&'p Path> {
    depends
      .iter()
      .map(PathBuf::as_path)
      .chain(std::iter::once(self.config_path))
      .find(|dep| mtimes.newer(dep, output))
  }
}
