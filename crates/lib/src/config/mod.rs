//! Declaration files: loading, profile resolution and source expansion.

pub mod expand;
pub mod load;
pub mod spec;
pub mod types;

pub use expand::{Expanded, expand_decl};
pub use load::load;
pub use spec::{Settings, Spec};
pub use types::{AssetDecl, Config, ConfigError, OutputSettings, SourceDecl};
