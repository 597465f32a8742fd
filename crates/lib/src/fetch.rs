//! Remote sources.
//!
//! `http://` and `https://` sources are downloaded once into the downloads
//! directory, mirroring the URL's host and path, and reused from there on every
//! later run.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::platform::paths::downloads_dir;

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("unsupported or unsafe URL: {0}")]
  InvalidUrl(String),

  #[error("couldn't download {url}: {message}")]
  Request { url: String, message: String },

  #[error("couldn't download {url} (got {status})")]
  Status { url: String, status: u16 },

  #[error("failed to save {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Resolves a remote source to a local file.
pub trait Fetcher {
  fn fetch(&self, url: &str) -> Result<PathBuf, FetchError>;
}

pub fn is_remote(source: &str) -> bool {
  source.starts_with("http://") || source.starts_with("https://")
}

/// Downloads over HTTP(S) into a local directory, once per URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  root: PathBuf,
}

impl HttpFetcher {
  pub fn new(root: PathBuf) -> Self {
    Self { root }
  }

  /// Fetcher rooted at `$ASSETGEN_DOWNLOADS_DIRECTORY` or `~/.assetgen`.
  pub fn default_location() -> Self {
    Self::new(downloads_dir())
  }

  /// Local path a URL is stored at.
  pub fn cache_path(&self, url: &str) -> Result<PathBuf, FetchError> {
    let rest = url
      .strip_prefix("https://")
      .or_else(|| url.strip_prefix("http://"))
      .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;

    let relative = Path::new(rest);
    let safe = relative
      .components()
      .all(|component| matches!(component, Component::Normal(_)));
    if rest.is_empty() || !safe {
      return Err(FetchError::InvalidUrl(url.to_string()));
    }

    Ok(self.root.join(relative))
  }
}

impl Fetcher for HttpFetcher {
  fn fetch(&self, url: &str) -> Result<PathBuf, FetchError> {
    let path = self.cache_path(url)?;
    if path.is_file() {
      return Ok(path);
    }

    info!(url = %url, "downloading");
    let response = reqwest::blocking::get(url).map_err(|e| FetchError::Request {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    let status = response.status();
    if status.as_u16() != 200 {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      });
    }

    let bytes = response.bytes().map_err(|e| FetchError::Request {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(|source| FetchError::Write {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    fs::write(&path, &bytes).map_err(|source| FetchError::Write {
      path: path.clone(),
      source,
    })?;

    info!(path = %path.display(), size = bytes.len(), "saved download");
    Ok(path)
  }
}
