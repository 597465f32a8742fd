//! Asset handlers.
//!
//! An [`AssetHandler`] turns an asset's sources into emitted content. Handlers
//! are looked up by type tag in a [`HandlerRegistry`] owned by the engine; the
//! built-in types are `binary`, `css` and `js`.

pub mod binary;
pub mod css;
pub mod js;
pub mod registry;
pub mod source;
pub mod transform;

use std::fmt::Debug;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::Spec;
use crate::engine::emit::{BuildContext, EmitError};

pub use registry::{HandlerFactory, HandlerRegistry};
pub use source::Source;
pub use transform::{ToolOutput, ToolRunner, TransformError};

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Transform(#[from] TransformError),

  #[error(transparent)]
  Emit(#[from] EmitError),

  #[error("could not detect the content type of {0}")]
  UnknownContentType(String),

  #[error("got error uglifying:\n{0}")]
  Uglify(String),

  /// Failure of a handler registered from outside this crate.
  #[error("{0}")]
  Other(Box<dyn std::error::Error + Send + Sync>),
}

/// A concrete asset: one output path with its expanded inputs.
#[derive(Debug, Clone)]
pub struct Asset {
  /// Logical path, relative to the output directory (or the config directory
  /// for prereqs). Also the asset's identity in the durable record.
  pub path: String,
  pub kind: String,
  pub sources: Vec<Source>,
  pub depends: Vec<PathBuf>,
  pub spec: Spec,
}

/// Generator for one asset type.
pub trait AssetHandler: Debug {
  /// Reads the asset's sources, transforms them and emits the result through
  /// `ctx`. Any error aborts the whole run.
  fn generate(&self, asset: &Asset, ctx: &mut BuildContext<'_>) -> Result<(), GenerateError>;
}
