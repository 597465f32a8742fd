//! Implementation of the `assetgen clean` command.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use assetgen_lib::EngineOptions;
use assetgen_lib::platform::paths::downloads_dir;

use super::configs;
use crate::output::{print_info, print_stat, print_success};

/// Removes what each config generated, and with `nuke` the download cache too.
pub fn cmd_clean(paths: &[PathBuf], options: &EngineOptions, nuke: bool) -> Result<()> {
  let paths = configs::resolve(paths)?;

  for path in &paths {
    let mut engine = configs::open(path, options)?;
    let summary = engine
      .clean()
      .with_context(|| format!("Clean failed: {}", path.display()))?;

    print_success(&format!("Cleaned {}", path.display()));
    print_stat("Prereqs removed", &summary.prereqs_removed.to_string());
    print_stat("Output directory removed", &summary.output_dir_removed.to_string());
    print_stat("Build record removed", &summary.state_removed.to_string());
  }

  if nuke {
    let downloads = downloads_dir();
    if downloads.exists() {
      fs::remove_dir_all(&downloads)
        .with_context(|| format!("Failed to remove downloads: {}", downloads.display()))?;
      print_success(&format!("Removed downloads: {}", downloads.display()));
    } else {
      print_info(&format!("No downloads at {}", downloads.display()));
    }
  }

  Ok(())
}
