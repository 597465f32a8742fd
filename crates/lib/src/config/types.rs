use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::spec::{Settings, Spec};
use crate::fetch::FetchError;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("could not find config {}: {source}", .path.display())]
  NotFound {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read config {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("no config found at {}", .0.display())]
  Empty(PathBuf),

  #[error("config at {} is not a mapping", .0.display())]
  NotMapping(PathBuf),

  #[error("environment variable {0} referenced by the config is not set")]
  MissingEnv(String),

  #[error("config keys must be strings, found {0}")]
  InvalidKey(String),

  #[error("value for {key} must be {expected}")]
  InvalidValue { key: String, expected: &'static str },

  #[error("no value found for {0}")]
  MissingField(&'static str),

  #[error("couldn't determine asset type for {0:?}")]
  UnknownKind(String),

  #[error("no handler found for asset type {0:?}")]
  UnknownType(String),

  #[error("no 'source' defined for {0}")]
  MissingSource(String),

  #[error("source for {0:?} cannot be raw text")]
  RawWildcardSource(String),

  #[error("glob source {0:?} must end in /* too")]
  WildcardMismatch(String),

  #[error("invalid source pattern {pattern:?}: {message}")]
  Pattern { pattern: String, message: String },

  #[error(transparent)]
  Fetch(#[from] FetchError),
}

/// One source entry as declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDecl {
  /// A path, URL or glob, relative to the config directory.
  Path(String),
  /// Inline text from `{raw: ...}`.
  Raw(String),
}

/// One asset declaration before source expansion.
#[derive(Debug, Clone)]
pub struct AssetDecl {
  /// Output path, or a `dir/*` wildcard.
  pub output: String,
  /// Handler type tag.
  pub kind: String,
  pub sources: Vec<SourceDecl>,
  pub depends: Vec<String>,
  pub spec: Spec,
}

impl AssetDecl {
  pub fn is_wildcard(&self) -> bool {
    self.output.ends_with("/*")
  }
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
  /// Absolute output directory.
  pub directory: PathBuf,
  /// Versioned filename template with `{hash}` and `{filename}`.
  pub template: String,
  pub hashed: bool,
  /// Absolute manifest file path, when one is configured.
  pub manifest: Option<PathBuf>,
  pub manifest_force: bool,
}

/// A fully loaded declaration file.
#[derive(Debug, Clone)]
pub struct Config {
  /// Absolute path of the config file.
  pub path: PathBuf,
  /// Directory holding the config; relative paths resolve against it.
  pub base_dir: PathBuf,
  pub output: OutputSettings,
  /// Environment overlay for external tools.
  pub env: BTreeMap<String, String>,
  pub settings: Settings,
  pub prereqs: Vec<AssetDecl>,
  pub generate: Vec<AssetDecl>,
}
