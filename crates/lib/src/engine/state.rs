//! Durable build record.
//!
//! One JSON file per config identity, inside the config's data directory:
//!
//! ```text
//! <data_root>/assetgen-<id>/
//! ├── lock
//! └── state.json
//! ```
//!
//! ```json
//! {
//!   "version": 1,
//!   "manifest": { "css/site.css": "css/4f1c…-site.css" },
//!   "outputs": { "css/site.css": ["css/4f1c…-site.css"] },
//!   "prereqs": { "src/gen.js": ["src/gen.js"] }
//! }
//! ```
//!
//! The record is a local cache, not meant to be shared across machines. An
//! unreadable or corrupt record is treated as empty, which forces a full
//! rebuild.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const STATE_VERSION: u32 = 1;

/// Asset identity to the set of paths it produced.
pub type ProducedSets = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildState {
  pub version: u32,
  /// Logical output path to its current versioned path.
  pub manifest: BTreeMap<String, String>,
  /// Output asset identity to versioned paths, relative to the output directory.
  pub outputs: ProducedSets,
  /// Prereq asset identity to paths, relative to the config directory.
  pub prereqs: ProducedSets,
}

impl Default for BuildState {
  fn default() -> Self {
    Self {
      version: STATE_VERSION,
      manifest: BTreeMap::new(),
      outputs: ProducedSets::new(),
      prereqs: ProducedSets::new(),
    }
  }
}

#[derive(Debug, Error)]
pub enum StateError {
  #[error("failed to create state directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to serialize build state: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write build state: {0}")]
  Write(#[source] io::Error),

  #[error("failed to remove build state: {0}")]
  Remove(#[source] io::Error),
}

/// Location of one config's durable record.
#[derive(Debug, Clone)]
pub struct StateStore {
  path: PathBuf,
}

impl StateStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Loads the record, degrading to an empty one on any failure.
  pub fn load(&self) -> BuildState {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %self.path.display(), "no build state yet");
        return BuildState::default();
      }
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "couldn't read build state, starting fresh");
        return BuildState::default();
      }
    };

    match serde_json::from_str::<BuildState>(&content) {
      Ok(state) if state.version == STATE_VERSION => {
        debug!(
          path = %self.path.display(),
          outputs = state.outputs.len(),
          prereqs = state.prereqs.len(),
          "loaded build state"
        );
        state
      }
      Ok(state) => {
        warn!(version = state.version, "unsupported build state version, starting fresh");
        BuildState::default()
      }
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "corrupt build state, starting fresh");
        BuildState::default()
      }
    }
  }

  /// Writes the whole record atomically.
  pub fn save(&self, state: &BuildState) -> Result<(), StateError> {
    if let Some(dir) = self.path.parent() {
      fs::create_dir_all(dir).map_err(StateError::CreateDir)?;
    }

    let content = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;

    let temp_path = self.path.with_extension("json.tmp");
    fs::write(&temp_path, &content).map_err(StateError::Write)?;
    fs::rename(&temp_path, &self.path).map_err(StateError::Write)?;

    debug!(path = %self.path.display(), "saved build state");
    Ok(())
  }

  /// Deletes the record. A missing record is not an error.
  pub fn remove(&self) -> Result<bool, StateError> {
    match fs::remove_file(&self.path) {
      Ok(()) => {
        info!(path = %self.path.display(), "removed build state");
        Ok(true)
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(StateError::Remove(e)),
    }
  }
}
