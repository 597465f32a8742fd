//! Flattened asset settings and their resolution.
//!
//! Settings are dotted keys (`css.embed.data_limit`) holding YAML values. An
//! asset's [`Spec`] is resolved once from the asset's own keys, the type-level
//! settings and the selected profile overlay, and is never mutated afterwards.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use super::types::ConfigError;
use crate::consts::DEFAULT_EMBED_DATA_LIMIT;

/// Config-wide flattened settings.
pub type Settings = BTreeMap<String, Value>;

const PROFILE_PREFIX: &str = "profile.";

/// Built-in defaults, applied to any key the config leaves unset.
pub fn defaults() -> Settings {
  let mut settings = Settings::new();
  settings.insert("css.bidi.extension".into(), Value::from(".rtl"));
  settings.insert("css.compressed".into(), Value::from(true));
  settings.insert("css.embed.data_limit".into(), Value::from(DEFAULT_EMBED_DATA_LIMIT));
  settings.insert("css.embed.extension".into(), Value::from(".data"));
  settings.insert("css.embed.only".into(), Value::from(false));
  settings.insert(
    "css.embed.url.template".into(),
    Value::from("{url_base}{prefix}/{hash}{filename}"),
  );
  settings.insert("js.compressed".into(), Value::from(true));
  settings.insert("js.bare".into(), Value::from(true));
  settings.insert("output.manifest_force".into(), Value::from(false));
  settings.insert("output.template".into(), Value::from("{hash}-{filename}"));
  settings
}

/// Flattens a mapping and merges the `profile.<profile>` overlay over it.
///
/// Every other `profile.*` key is dropped.
pub fn apply_profile(mapping: &Mapping, profile: &str) -> Result<Settings, ConfigError> {
  let selected = format!("{}{}", PROFILE_PREFIX, profile);
  let mut settings = Settings::new();
  let mut overlay = None;

  for (key, value) in mapping {
    let key = key_str(key)?;
    if key.starts_with(PROFILE_PREFIX) {
      if key == selected {
        overlay = Some(profile_mapping(key, value)?);
      }
      continue;
    }
    settings.insert(key.to_string(), value.clone());
  }

  if let Some(overlay) = overlay {
    for (key, value) in overlay {
      settings.insert(key_str(key)?.to_string(), value.clone());
    }
  }

  Ok(settings)
}

/// Resolves the spec for one asset of type `kind`.
///
/// Precedence, lowest first: type-level settings (`<kind>.<key>`), the asset's
/// own keys, the asset's `profile.<profile>` overlay. The `type` key is dropped.
pub fn resolve(kind: &str, settings: &Settings, overrides: &Mapping, profile: &str) -> Result<Spec, ConfigError> {
  let mut values = apply_profile(overrides, profile)?;

  let prefix = format!("{}.", kind);
  for (key, value) in settings {
    if let Some(rest) = key.strip_prefix(&prefix) {
      values.entry(rest.to_string()).or_insert_with(|| value.clone());
    }
  }

  values.remove("type");
  Ok(Spec { values })
}

fn key_str(key: &Value) -> Result<&str, ConfigError> {
  key.as_str().ok_or_else(|| ConfigError::InvalidKey(format!("{:?}", key)))
}

fn profile_mapping<'a>(key: &str, value: &'a Value) -> Result<&'a Mapping, ConfigError> {
  value.as_mapping().ok_or_else(|| ConfigError::InvalidValue {
    key: key.to_string(),
    expected: "a mapping",
  })
}

/// Python-style truthiness of a YAML value.
pub fn truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    Value::String(s) => !s.is_empty(),
    Value::Sequence(seq) => !seq.is_empty(),
    Value::Mapping(map) => !map.is_empty(),
    Value::Tagged(tagged) => truthy(&tagged.value),
  }
}

/// Resolved, immutable settings of a single asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spec {
  values: BTreeMap<String, Value>,
}

impl Spec {
  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  /// Truthiness of `key`; missing keys are false.
  pub fn flag(&self, key: &str) -> bool {
    self.values.get(key).is_some_and(truthy)
  }

  pub fn str(&self, key: &str) -> Option<&str> {
    self.values.get(key).and_then(Value::as_str)
  }

  /// A non-negative integer setting. Present but non-integer values are errors.
  pub fn u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
    match self.values.get(key) {
      None | Some(Value::Null) => Ok(None),
      Some(value) => value.as_u64().map(Some).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        expected: "a non-negative integer",
      }),
    }
  }

  /// Extra command-line arguments: a string is one argument, a list is many,
  /// anything else is none.
  pub fn args(&self, key: &str) -> Vec<String> {
    match self.values.get(key) {
      Some(Value::String(s)) => vec![s.clone()],
      Some(Value::Sequence(items)) => items
        .iter()
        .filter_map(|item| match item {
          Value::String(s) => Some(s.clone()),
          Value::Number(n) => Some(n.to_string()),
          _ => None,
        })
        .collect(),
      _ => Vec::new(),
    }
  }

  pub(crate) fn take(&mut self, key: &str) -> Option<Value> {
    self.values.remove(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(String::as_str)
  }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Spec {
  fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
    Spec {
      values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    }
  }
}
