//! Implementation of the `assetgen watch` command.
//!
//! Runs until the interrupt flag is raised; aborts inside the loop are logged
//! and never end it.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use assetgen_lib::{EngineOptions, WatchOptions, Watcher};

use super::configs;
use crate::output::print_info;

pub fn cmd_watch(paths: &[PathBuf], options: &EngineOptions, interval: Duration, cooldown: Duration) -> Result<()> {
  let paths = configs::resolve(paths)?;

  let mut watcher = Watcher::new(&paths, WatchOptions { interval, cooldown }, |path: &Path| {
    configs::open_engine(path, options)
  })
  .context("Failed to start watching")?;

  print_info(&format!("Watching {} config(s), press Ctrl-C to stop", paths.len()));
  let stop = options.interrupt.clone();
  let summary = watcher.run(|| stop.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)));
  info!(
    iterations = summary.iterations,
    aborts = summary.aborts,
    reloads = summary.reloads,
    "watch finished"
  );
  Ok(())
}
