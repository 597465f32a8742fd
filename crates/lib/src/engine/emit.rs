//! Emission sink.
//!
//! Every byte a handler produces goes through [`BuildContext::emit`]. Prereqs
//! land verbatim in the source tree. Outputs land in the output directory,
//! optionally under a content-addressed name, and the manifest keeps exactly
//! one live versioned file per logical path: the previous version is deleted
//! as soon as a new one is written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::freshness::MtimeCache;
use super::state::BuildState;
use super::types::Phase;
use crate::asset::ToolRunner;
use crate::config::OutputSettings;
use crate::util::hash::hash_bytes;

#[derive(Debug, Error)]
pub enum EmitError {
  #[error("failed to create directory {}: {source}", .path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Mutable bookkeeping of one engine, shared by freshness checks and emission.
#[derive(Debug, Default)]
pub struct Ledger {
  pub state: BuildState,
  pub mtimes: MtimeCache,
  /// Manifest changed since it was last written.
  pub manifest_dirty: bool,
  /// Durable record changed since it was last written.
  pub state_dirty: bool,
}

/// Handle given to a handler while it generates one asset.
pub struct BuildContext<'a> {
  phase: Phase,
  key: &'a str,
  base_dir: &'a Path,
  output: &'a OutputSettings,
  tools: &'a ToolRunner,
  ledger: &'a mut Ledger,
}

impl<'a> BuildContext<'a> {
  pub fn new(
    phase: Phase,
    key: &'a str,
    base_dir: &'a Path,
    output: &'a OutputSettings,
    tools: &'a ToolRunner,
    ledger: &'a mut Ledger,
  ) -> Self {
    Self {
      phase,
      key,
      base_dir,
      output,
      tools,
      ledger,
    }
  }

  /// Directory of the config; relative paths in settings resolve against it.
  pub fn base_dir(&self) -> &Path {
    self.base_dir
  }

  /// Whether output filenames are content-addressed.
  pub fn hashed(&self) -> bool {
    self.output.hashed
  }

  pub fn tools(&self) -> &ToolRunner {
    self.tools
  }

  /// Writes `content` for logical `path`, with `extension` inserted before the
  /// file's own extension. Returns the physical path written.
  pub fn emit(&mut self, path: &str, content: &[u8], extension: &str) -> Result<PathBuf, EmitError> {
    let logical = insert_extension(path, extension);
    match self.phase {
      Phase::Prereq => self.emit_prereq(logical, content),
      Phase::Output => self.emit_output(logical, content),
    }
  }

  fn emit_prereq(&mut self, logical: String, content: &[u8]) -> Result<PathBuf, EmitError> {
    let real = self.base_dir.join(&logical);
    write_bytes(&real, content)?;
    self.ledger.mtimes.invalidate(&real);

    info!(path = %logical, "generated prereq");
    self
      .ledger
      .state
      .prereqs
      .entry(self.key.to_string())
      .or_default()
      .insert(logical);
    Ok(real)
  }

  fn emit_output(&mut self, logical: String, content: &[u8]) -> Result<PathBuf, EmitError> {
    let versioned = if self.output.hashed {
      let digest = hash_bytes(content);
      let (dir, filename) = split_logical(&logical);
      let name = render_template(&self.output.template, &digest.0, filename);
      info!(path = %logical, hash = digest.short(), "generated output");
      join_logical(dir, &name)
    } else {
      info!(path = %logical, "generated output");
      logical.clone()
    };

    let real = self.output.directory.join(&versioned);
    write_bytes(&real, content)?;
    self.ledger.mtimes.invalidate(&real);

    self
      .ledger
      .state
      .outputs
      .entry(self.key.to_string())
      .or_default()
      .insert(versioned.clone());

    let previous = self.ledger.state.manifest.get(&logical).cloned();
    if previous.as_deref() == Some(versioned.as_str()) {
      return Ok(real);
    }
    if let Some(previous) = previous {
      self.remove_stale(&previous);
    }
    self.ledger.state.manifest.insert(logical, versioned);
    self.ledger.manifest_dirty = true;
    Ok(real)
  }

  /// Deletes a superseded versioned file. Failures are ignored.
  fn remove_stale(&mut self, versioned: &str) {
    let path = self.output.directory.join(versioned);
    match fs::remove_file(&path) {
      Ok(()) => info!(path = %versioned, "removed stale"),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => debug!(path = %versioned, error = %e, "couldn't remove stale output"),
    }
    self.ledger.mtimes.invalidate(&path);
  }
}

fn write_bytes(path: &Path, content: &[u8]) -> Result<(), EmitError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|source| EmitError::CreateDir {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  fs::write(path, content).map_err(|source| EmitError::Write {
    path: path.to_path_buf(),
    source,
  })
}

/// Splits a `/`-separated logical path into directory and filename.
pub fn split_logical(path: &str) -> (&str, &str) {
  match path.rsplit_once('/') {
    Some((dir, filename)) => (dir, filename),
    None => ("", path),
  }
}

fn join_logical(dir: &str, filename: &str) -> String {
  if dir.is_empty() {
    filename.to_string()
  } else {
    format!("{}/{}", dir, filename)
  }
}

/// Inserts `extension` before the filename's last extension:
/// `css/site.css` + `.rtl` is `css/site.rtl.css`.
///
/// A leading dot does not start an extension, so `.htaccess` + `.x` is
/// `.htaccess.x`.
pub fn insert_extension(path: &str, extension: &str) -> String {
  if extension.is_empty() {
    return path.to_string();
  }
  let (dir, filename) = split_logical(path);
  let stem_len = filename
    .rfind('.')
    .filter(|&dot| filename[..dot].chars().any(|c| c != '.'))
    .unwrap_or(filename.len());
  let (stem, ext) = filename.split_at(stem_len);
  join_logical(dir, &format!("{}{}{}", stem, extension, ext))
}

/// Fills `{hash}` and `{filename}` in an output name template.
pub fn render_template(template: &str, hash: &str, filename: &str) -> String {
  template.replace("{hash}", hash).replace("{filename}", filename)
}
