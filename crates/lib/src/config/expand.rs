//! Source and dependency expansion.
//!
//! Turns an [`AssetDecl`] into one or more concrete assets: globs are expanded
//! against the filesystem, remote URLs are resolved to local downloads and
//! `dir/*` outputs are mirrored file by file.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use super::types::{AssetDecl, ConfigError, SourceDecl};
use crate::asset::Source;
use crate::fetch::{Fetcher, is_remote};

/// An asset declaration with every source and dependency made concrete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expanded {
  /// Output path relative to the output directory (or source tree for prereqs).
  pub output: String,
  pub sources: Vec<Source>,
  pub depends: Vec<PathBuf>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: false,
  require_literal_leading_dot: false,
};

/// Expands one declaration relative to `base_dir`.
pub fn expand_decl(base_dir: &Path, decl: &AssetDecl, fetcher: &dyn Fetcher) -> Result<Vec<Expanded>, ConfigError> {
  let mut depends = Vec::new();
  for dep in &decl.depends {
    depends.extend(expand_path(base_dir, dep, fetcher)?);
  }

  if decl.is_wildcard() {
    return expand_wildcard(base_dir, decl, &depends);
  }

  let mut sources = Vec::with_capacity(decl.sources.len());
  for source in &decl.sources {
    match source {
      SourceDecl::Raw(text) => sources.push(Source::Raw(text.clone())),
      SourceDecl::Path(path) => {
        for file in expand_path(base_dir, path, fetcher)? {
          depends.push(file.clone());
          sources.push(Source::File(file));
        }
      }
    }
  }

  Ok(vec![Expanded {
    output: decl.output.clone(),
    sources,
    depends,
  }])
}

fn expand_wildcard(base_dir: &Path, decl: &AssetDecl, depends: &[PathBuf]) -> Result<Vec<Expanded>, ConfigError> {
  let prefix = decl.output.trim_end_matches("/*");
  let mut assets = Vec::new();

  for source in &decl.sources {
    let dir = match source {
      SourceDecl::Raw(_) => return Err(ConfigError::RawWildcardSource(decl.output.clone())),
      SourceDecl::Path(path) => path
        .strip_suffix("/*")
        .ok_or_else(|| ConfigError::WildcardMismatch(path.clone()))?,
    };

    let root = base_dir.join(dir);
    for file in walk_files(&root) {
      let Ok(relative) = file.strip_prefix(&root) else {
        continue;
      };
      let relative = relative.to_string_lossy().replace('\\', "/");
      let output = if prefix.is_empty() {
        relative
      } else {
        format!("{}/{}", prefix, relative)
      };

      let mut file_depends = depends.to_vec();
      file_depends.push(file.clone());
      assets.push(Expanded {
        output,
        sources: vec![Source::File(file)],
        depends: file_depends,
      });
    }
  }

  Ok(assets)
}

/// Resolves one declared path: a URL, a glob or a plain path.
pub fn expand_path(base_dir: &Path, path: &str, fetcher: &dyn Fetcher) -> Result<Vec<PathBuf>, ConfigError> {
  if is_remote(path) {
    return Ok(vec![fetcher.fetch(path)?]);
  }

  let joined = base_dir.join(path);
  if !path.contains('*') {
    return Ok(vec![joined]);
  }
  glob_files(&joined)
}

/// Files matching a shell-style pattern, where `*` may cross directories.
pub fn glob_files(pattern: &Path) -> Result<Vec<PathBuf>, ConfigError> {
  let text = pattern.to_string_lossy();
  let compiled = Pattern::new(&text).map_err(|e| ConfigError::Pattern {
    pattern: text.to_string(),
    message: e.msg.to_string(),
  })?;

  let star = text.find('*').unwrap_or(text.len());
  let root = match text[..star].rfind(['/', '\\']) {
    Some(index) => PathBuf::from(&text[..index]),
    None => PathBuf::from("."),
  };

  Ok(
    walk_files(&root)
      .into_iter()
      .filter(|file| compiled.matches_path_with(file, MATCH_OPTIONS))
      .collect(),
  )
}

fn walk_files(root: &Path) -> Vec<PathBuf> {
  WalkDir::new(root)
    .sort_by_file_name()
    .into_iter()
    .filter_map(Result::ok)
    .filter(|entry| entry.file_type().is_file())
    .map(|entry| entry.into_path())
    .collect()
}
