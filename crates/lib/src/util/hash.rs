//! Hashing utilities for content-addressed output names and config identities.
//!
//! This module provides:
//! - `ContentHash`: a full 64-character SHA-256 of emitted bytes
//! - `ConfigId`: a short, stable digest of a config file's absolute path
//! - `hash_bytes()`

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::CONFIG_ID_LEN;

/// A full 64-character SHA-256 hash, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl fmt::Display for ContentHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl ContentHash {
  /// Leading characters, for log lines.
  pub fn short(&self) -> &str {
    &self.0[..self.0.len().min(6)]
  }
}

/// Identity of a config file: a truncated digest of its absolute path.
///
/// Two engines pointed at the same config share a lock and a durable record;
/// configs at different paths never collide on either.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigId(pub String);

impl fmt::Display for ConfigId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl ConfigId {
  pub fn for_path(absolute: &Path) -> Self {
    let full = hash_bytes(absolute.to_string_lossy().as_bytes());
    ConfigId(full.0[..CONFIG_ID_LEN].to_string())
  }
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}
