//! Implementation of the `assetgen build` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use assetgen_lib::EngineOptions;

use super::configs;
use crate::output::{OutputFormat, format_duration, print_info, print_json, print_stat, print_success};

/// Runs every config once, stopping at the first abort.
pub fn cmd_build(paths: &[PathBuf], options: &EngineOptions, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let paths = configs::resolve(paths)?;
  let mut reports = Vec::with_capacity(paths.len());

  for path in &paths {
    let mut engine = configs::open(path, options)?;
    let summary = engine
      .run()
      .with_context(|| format!("Build failed: {}", path.display()))?;

    if !output.is_json() {
      if summary.generated() == 0 {
        print_info(&format!("{}: up to date", path.display()));
      } else {
        print_success(&format!("{}", path.display()));
        print_stat("Prereqs generated", &summary.prereqs_generated.to_string());
        print_stat("Outputs generated", &summary.outputs_generated.to_string());
        if summary.manifest_written {
          print_stat("Manifest", "updated");
        }
      }
    }

    reports.push(serde_json::json!({
      "config": path,
      "prereqs_generated": summary.prereqs_generated,
      "outputs_generated": summary.outputs_generated,
      "manifest_written": summary.manifest_written,
      "state_written": summary.state_written,
    }));
  }

  if output.is_json() {
    print_json(&reports)?;
  } else {
    print_stat("Duration", &format_duration(start.elapsed()));
  }
  Ok(())
}
