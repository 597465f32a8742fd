//! Polling watch loop.
//!
//! Single-threaded: every iteration runs each engine in turn, then checks each
//! config file's mtime and rebuilds the engine of any config that changed. A
//! failed run or reload is logged and followed by a longer cooldown; it never
//! ends the loop. An interrupted run ends the iteration early, leaving the stop
//! predicate to end the loop.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{error, info};

use super::Engine;
use super::types::BuildError;

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
  /// Pause after a clean iteration.
  pub interval: Duration,
  /// Pause after an iteration with an abort.
  pub cooldown: Duration,
}

impl Default for WatchOptions {
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(1),
      cooldown: Duration::from_secs(3),
    }
  }
}

/// Counters for a finished watch session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSummary {
  pub iterations: usize,
  pub aborts: usize,
  pub reloads: usize,
}

struct Tracked {
  path: PathBuf,
  mtime: Option<SystemTime>,
  /// `None` after a failed reload, until the config changes again.
  engine: Option<Engine>,
}

/// Drives a set of engines, reopening them through `open` when their config
/// changes.
pub struct Watcher<F>
where
  F: FnMut(&Path) -> Result<Engine, BuildError>,
{
  open: F,
  tracked: Vec<Tracked>,
  options: WatchOptions,
}

impl<F> Watcher<F>
where
  F: FnMut(&Path) -> Result<Engine, BuildError>,
{
  /// Opens an engine per config. Failing to open any of them is fatal.
  pub fn new(configs: &[PathBuf], options: WatchOptions, mut open: F) -> Result<Self, BuildError> {
    let mut tracked = Vec::with_capacity(configs.len());
    for path in configs {
      let engine = open(path)?;
      let path = engine.config_path().to_path_buf();
      tracked.push(Tracked {
        mtime: mtime(&path),
        path,
        engine: Some(engine),
      });
    }
    Ok(Self { open, tracked, options })
  }

  /// Engines currently active, in config order.
  pub fn engines(&self) -> impl Iterator<Item = &Engine> {
    self.tracked.iter().filter_map(|t| t.engine.as_ref())
  }

  /// Loops until `should_stop` returns true. It is checked before every
  /// iteration.
  pub fn run(&mut self, mut should_stop: impl FnMut() -> bool) -> WatchSummary {
    let mut summary = WatchSummary::default();
    info!(configs = self.tracked.len(), "watching for changes");

    while !should_stop() {
      let clean = self.poll(&mut summary);
      summary.iterations += 1;
      thread::sleep(if clean {
        self.options.interval
      } else {
        self.options.cooldown
      });
    }
    summary
  }

  /// One iteration: run every engine, then reload changed configs. Returns
  /// false if anything aborted.
  pub fn poll(&mut self, summary: &mut WatchSummary) -> bool {
    let mut clean = true;

    for tracked in &mut self.tracked {
      let Some(engine) = tracked.engine.as_mut() else {
        continue;
      };
      match engine.run() {
        Ok(_) => {}
        Err(BuildError::Interrupted) => {
          info!(config = %tracked.path.display(), "run interrupted");
          return clean;
        }
        Err(e) => {
          error!(config = %tracked.path.display(), error = %e, "build aborted");
          summary.aborts += 1;
          clean = false;
          break;
        }
      }
    }

    for tracked in &mut self.tracked {
      let current = mtime(&tracked.path);
      if current <= tracked.mtime {
        continue;
      }
      tracked.mtime = current;
      info!(config = %tracked.path.display(), "config changed, reloading");
      summary.reloads += 1;

      // The old engine holds the config's lock.
      tracked.engine = None;
      match (self.open)(&tracked.path) {
        Ok(engine) => tracked.engine = Some(engine),
        Err(e) => {
          error!(config = %tracked.path.display(), error = %e, "reload failed");
          summary.aborts += 1;
          clean = false;
        }
      }
    }

    clean
  }
}

fn mtime(path: &Path) -> Option<SystemTime> {
  std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
