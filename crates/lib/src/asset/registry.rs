//! Type tag to handler constructor.
//!
//! The registry is plain data owned by whoever builds engines; there is no
//! process-wide table. Extra asset types are added with [`HandlerRegistry::register`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::AssetHandler;
use super::binary::BinaryHandler;
use super::css::CssHandler;
use super::js::JsHandler;
use crate::config::{ConfigError, Spec};

/// Builds a handler from an asset's resolved spec.
pub type HandlerFactory = Arc<dyn Fn(&Spec) -> Result<Box<dyn AssetHandler>, ConfigError> + Send + Sync>;

#[derive(Clone)]
pub struct HandlerRegistry {
  factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
  /// A registry with no types at all.
  pub fn empty() -> Self {
    Self {
      factories: HashMap::new(),
    }
  }

  /// A registry with the `binary`, `css` and `js` types.
  pub fn with_builtins() -> Self {
    let mut registry = Self::empty();
    registry.register("binary", |_| Ok(Box::new(BinaryHandler)));
    registry.register("css", |spec| Ok(Box::new(CssHandler::from_spec(spec)?)));
    registry.register("js", |spec| Ok(Box::new(JsHandler::from_spec(spec)?)));
    registry
  }

  /// Registers (or replaces) the handler for `kind`.
  pub fn register<F>(&mut self, kind: &str, factory: F)
  where
    F: Fn(&Spec) -> Result<Box<dyn AssetHandler>, ConfigError> + Send + Sync + 'static,
  {
    self.factories.insert(kind.to_string(), Arc::new(factory));
  }

  pub fn contains(&self, kind: &str) -> bool {
    self.factories.contains_key(kind)
  }

  /// Instantiates the handler for `kind`.
  pub fn create(&self, kind: &str, spec: &Spec) -> Result<Box<dyn AssetHandler>, ConfigError> {
    let factory = self
      .factories
      .get(kind)
      .ok_or_else(|| ConfigError::UnknownType(kind.to_string()))?;
    factory(spec)
  }

  pub fn kinds(&self) -> Vec<&str> {
    let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
    kinds.sort_unstable();
    kinds
  }
}

impl Default for HandlerRegistry {
  fn default() -> Self {
    Self::with_builtins()
  }
}

impl fmt::Debug for HandlerRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HandlerRegistry").field("kinds", &self.kinds()).finish()
  }
}
