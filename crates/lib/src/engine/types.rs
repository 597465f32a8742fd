use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use thiserror::Error;

use super::emit::EmitError;
use super::state::StateError;
use crate::asset::GenerateError;
use crate::config::ConfigError;
use crate::consts::DEFAULT_PROFILE;
use crate::lock::LockError;
use crate::platform::paths::default_data_root;

/// The single abort condition of a run.
///
/// Any of these stops the current config's processing. Outside the watch loop
/// it ends the process; inside it, the loop cools down and carries on.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("{}: {source}", .config.display())]
  Config {
    config: PathBuf,
    #[source]
    source: ConfigError,
  },

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error("failed to generate {asset}: {source}")]
  Generate {
    asset: String,
    #[source]
    source: GenerateError,
  },

  #[error(transparent)]
  State(#[from] StateError),

  #[error(transparent)]
  Emit(#[from] EmitError),

  #[error("failed to write manifest {}: {source}", .path.display())]
  Manifest {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The interrupt flag was raised between two asset generations.
  #[error("interrupted")]
  Interrupted,

  #[error("failed to clean {}: {source}", .path.display())]
  Clean {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Which half of a run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// Assets written back into the source tree.
  Prereq,
  /// Assets written to the output directory.
  Output,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::Prereq => write!(f, "prereq"),
      Phase::Output => write!(f, "output"),
    }
  }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
  /// Profile overlay to resolve settings with.
  pub profile: String,
  /// Regenerate everything regardless of freshness.
  pub force: bool,
  /// Parent of the per-config data directories.
  pub data_root: PathBuf,
  /// Once set, runs stop before the next asset generation.
  pub interrupt: Option<Arc<AtomicBool>>,
}

impl Default for EngineOptions {
  fn default() -> Self {
    Self {
      profile: DEFAULT_PROFILE.to_string(),
      force: false,
      data_root: default_data_root(),
      interrupt: None,
    }
  }
}

/// What a single `run()` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
  pub prereqs_generated: usize,
  pub outputs_generated: usize,
  pub manifest_written: bool,
  pub state_written: bool,
}

impl RunSummary {
  pub fn generated(&self) -> usize {
    self.prereqs_generated + self.outputs_generated
  }
}

/// What `clean()` removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
  pub prereqs_removed: usize,
  pub output_dir_removed: bool,
  pub state_removed: bool,
}
