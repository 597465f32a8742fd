//! Locating config files and opening their engines.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::debug;

use assetgen_lib::{BuildError, Engine, EngineOptions, HandlerRegistry, HttpFetcher};

/// `git ls-files` pathspec matching config files anywhere in the repository.
const CONFIG_PATHSPEC: &str = "*assetgen.yaml";

/// Canonicalises the given config paths, or discovers the tracked configs of
/// the enclosing git repository when none are given.
pub fn resolve(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
  let paths = if paths.is_empty() {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    discover(&cwd)?
  } else {
    paths.to_vec()
  };

  paths
    .iter()
    .map(|p| dunce::canonicalize(p).with_context(|| format!("Config not found: {}", p.display())))
    .collect()
}

fn discover(cwd: &Path) -> Result<Vec<PathBuf>> {
  let root = git(cwd, &["rev-parse", "--show-toplevel"])
    .context("Not inside a git repository; pass config paths explicitly")?;
  let root = PathBuf::from(root.trim());

  let listed = git(&root, &["ls-files", CONFIG_PATHSPEC])?;
  let configs: Vec<PathBuf> = listed
    .lines()
    .filter(|line| !line.is_empty())
    .map(|line| root.join(line))
    .collect();

  if configs.is_empty() {
    bail!("No tracked {} files under {}", CONFIG_PATHSPEC, root.display());
  }
  debug!(root = %root.display(), count = configs.len(), "discovered configs");
  Ok(configs)
}

fn git(cwd: &Path, args: &[&str]) -> Result<String> {
  let output = Command::new("git")
    .args(args)
    .current_dir(cwd)
    .output()
    .context("Failed to run git")?;

  if !output.status.success() {
    bail!(
      "git {} failed: {}",
      args.join(" "),
      String::from_utf8_lossy(&output.stderr).trim()
    );
  }
  String::from_utf8(output.stdout).context("git printed non-UTF-8 output")
}

/// Opens the engine for one config with the built-in handlers.
pub fn open_engine(path: &Path, options: &EngineOptions) -> Result<Engine, BuildError> {
  let registry = HandlerRegistry::with_builtins();
  let fetcher = HttpFetcher::default_location();
  Engine::open(path, options, &registry, &fetcher)
}

pub fn open(path: &Path, options: &EngineOptions) -> Result<Engine> {
  open_engine(path, options).with_context(|| format!("Failed to open config: {}", path.display()))
}
