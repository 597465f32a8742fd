mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use assetgen_lib::EngineOptions;
use assetgen_lib::consts::DEFAULT_PROFILE;

use crate::output::{OutputFormat, print_error};

/// assetgen - incremental front-end asset builds
#[derive(Parser)]
#[command(name = "assetgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Profile overlay to resolve settings with
  #[arg(short, long, global = true, default_value = DEFAULT_PROFILE)]
  profile: String,

  /// Regenerate every asset regardless of freshness
  #[arg(short, long, global = true)]
  force: bool,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run each config once
  Build {
    /// Config files (default: every tracked assetgen.yaml in the git repository)
    configs: Vec<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Rebuild continuously as sources and configs change
  Watch {
    /// Config files (default: every tracked assetgen.yaml in the git repository)
    configs: Vec<PathBuf>,

    /// Pause between iterations (e.g., "1s", "500ms")
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    interval: Duration,

    /// Pause after a failed iteration
    #[arg(long, value_parser = humantime::parse_duration, default_value = "3s")]
    cooldown: Duration,
  },

  /// Remove generated prereqs, output directories and build records
  Clean {
    /// Config files (default: every tracked assetgen.yaml in the git repository)
    configs: Vec<PathBuf>,

    /// Also delete downloaded remote sources
    #[arg(long)]
    nuke: bool,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let interrupt = Arc::new(AtomicBool::new(false));
  let options = EngineOptions {
    profile: cli.profile,
    force: cli.force,
    interrupt: Some(Arc::clone(&interrupt)),
    ..EngineOptions::default()
  };

  let result = match cli.command {
    Commands::Build { configs, output } => {
      handle_interrupts(&interrupt).and_then(|()| cmd::cmd_build(&configs, &options, output))
    }
    Commands::Watch {
      configs,
      interval,
      cooldown,
    } => handle_interrupts(&interrupt).and_then(|()| cmd::cmd_watch(&configs, &options, interval, cooldown)),
    Commands::Clean { configs, nuke } => cmd::cmd_clean(&configs, &options, nuke),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}

/// Routes Ctrl-C into `flag` so runs stop between two asset generations.
/// A second Ctrl-C exits immediately.
fn handle_interrupts(flag: &Arc<AtomicBool>) -> anyhow::Result<()> {
  let flag = Arc::clone(flag);
  ctrlc::set_handler(move || {
    if flag.swap(true, Ordering::SeqCst) {
      std::process::exit(130);
    }
  })
  .context("Failed to install interrupt handler")
}
