//! Loading `assetgen.yaml` declaration files.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::spec::{Settings, apply_profile, defaults, resolve, truthy};
use super::types::{AssetDecl, Config, ConfigError, OutputSettings, SourceDecl};

static PLACEHOLDER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"%(?:%|\(([^)]*)\)s)").expect("placeholder pattern is valid"));

/// Loads and resolves the config at `path` for `profile`.
pub fn load(path: &Path, profile: &str) -> Result<Config, ConfigError> {
  let path = dunce::canonicalize(path).map_err(|source| ConfigError::NotFound {
    path: path.to_path_buf(),
    source,
  })?;
  let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
    path: path.clone(),
    source,
  })?;

  let lookup = |name: &str| std::env::var(name).ok();
  let text = interpolate(&raw, lookup)?;
  parse(&text, &path, profile, lookup)
}

/// Replaces `%(NAME)s` with environment values and `%%` with `%`.
pub fn interpolate(text: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
  let mut missing = None;
  let replaced = PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| match caps.get(1) {
    None => "%".to_string(),
    Some(name) => lookup(name.as_str()).unwrap_or_else(|| {
      missing.get_or_insert_with(|| name.as_str().to_string());
      String::new()
    }),
  });

  match missing {
    Some(name) => Err(ConfigError::MissingEnv(name)),
    None => Ok(replaced.into_owned()),
  }
}

/// Computes the environment overlay for external tools.
///
/// `NAME.prefix` prepends to the current value, `NAME.append` appends, anything
/// else replaces. Prefix/append on an unset variable just sets it.
pub fn resolve_env(
  env: &Mapping,
  lookup: impl Fn(&str) -> Option<String>,
) -> Result<BTreeMap<String, String>, ConfigError> {
  let mut resolved: BTreeMap<String, String> = BTreeMap::new();

  for (key, value) in env {
    let key = key
      .as_str()
      .ok_or_else(|| ConfigError::InvalidKey(format!("{:?}", key)))?;
    let value = scalar_string(value).ok_or_else(|| ConfigError::InvalidValue {
      key: format!("env.{}", key),
      expected: "a string",
    })?;

    let (name, action) = match key.split_once('.') {
      Some((name, action)) => (name, Some(action)),
      None => (key, None),
    };
    let existing = resolved.get(name).cloned().or_else(|| lookup(name));

    let new_value = match (action, existing) {
      (Some("prefix"), Some(existing)) if !existing.is_empty() => format!("{}:{}", value, existing),
      (Some("append"), Some(existing)) if !existing.is_empty() => format!("{}:{}", existing, value),
      _ => value,
    };
    resolved.insert(name.to_string(), new_value);
  }

  Ok(resolved)
}

/// Parses already-interpolated config text. `path` must be absolute.
pub fn parse(
  text: &str,
  path: &Path,
  profile: &str,
  lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
  let document: Value = serde_yaml::from_str(text)?;
  let mapping = match document {
    Value::Null => return Err(ConfigError::Empty(path.to_path_buf())),
    Value::Mapping(mapping) if mapping.is_empty() => return Err(ConfigError::Empty(path.to_path_buf())),
    Value::Mapping(mapping) => mapping,
    _ => return Err(ConfigError::NotMapping(path.to_path_buf())),
  };

  let mut settings = apply_profile(&mapping, profile)?;
  for (key, value) in defaults() {
    settings.entry(key).or_insert(value);
  }

  let env = match settings.remove("env") {
    Some(Value::Mapping(env)) => resolve_env(&env, lookup)?,
    Some(Value::Null) | None => BTreeMap::new(),
    Some(_) => {
      return Err(ConfigError::InvalidValue {
        key: "env".into(),
        expected: "a mapping",
      });
    }
  };

  let base_dir = path.parent().unwrap_or(Path::new("/")).to_path_buf();

  let directory = match settings.remove("output.directory") {
    Some(value) => scalar_string(&value)
      .filter(|s| !s.is_empty())
      .ok_or(ConfigError::MissingField("output.directory"))?,
    None => return Err(ConfigError::MissingField("output.directory")),
  };
  let template = settings
    .remove("output.template")
    .as_ref()
    .and_then(scalar_string)
    .ok_or(ConfigError::InvalidValue {
      key: "output.template".into(),
      expected: "a string",
    })?;
  let hashed = settings.remove("output.hashed").is_some_and(|v| truthy(&v));
  let manifest = settings
    .remove("output.manifest")
    .as_ref()
    .and_then(scalar_string)
    .filter(|s| !s.is_empty())
    .map(|m| base_dir.join(m));
  let manifest_force = settings.remove("output.manifest_force").is_some_and(|v| truthy(&v));

  let prereqs = match settings.remove("prereqs") {
    Some(listing) => parse_listing("prereqs", &listing, &settings, profile)?,
    None => Vec::new(),
  };
  let generate = match settings.remove("generate") {
    Some(listing) => parse_listing("generate", &listing, &settings, profile)?,
    None => Vec::new(),
  };
  if generate.is_empty() {
    return Err(ConfigError::MissingField("generate"));
  }

  debug!(
    config = %path.display(),
    prereqs = prereqs.len(),
    outputs = generate.len(),
    "loaded config"
  );

  Ok(Config {
    path: path.to_path_buf(),
    output: OutputSettings {
      directory: base_dir.join(directory),
      template,
      hashed,
      manifest,
      manifest_force,
    },
    base_dir,
    env,
    settings,
    prereqs,
    generate,
  })
}

fn parse_listing(
  key: &'static str,
  listing: &Value,
  settings: &Settings,
  profile: &str,
) -> Result<Vec<AssetDecl>, ConfigError> {
  let items = match listing {
    Value::Null => return Ok(Vec::new()),
    Value::Sequence(items) => items,
    _ => {
      return Err(ConfigError::InvalidValue {
        key: key.into(),
        expected: "a list of assets",
      });
    }
  };

  items.iter().map(|item| parse_asset(item, settings, profile)).collect()
}

fn parse_asset(item: &Value, settings: &Settings, profile: &str) -> Result<AssetDecl, ConfigError> {
  let entry = item
    .as_mapping()
    .and_then(|m| m.iter().next())
    .ok_or(ConfigError::InvalidValue {
      key: "asset".into(),
      expected: "a single-key mapping of output path to settings",
    })?;

  let output = entry
    .0
    .as_str()
    .ok_or_else(|| ConfigError::InvalidKey(format!("{:?}", entry.0)))?
    .to_string();

  let empty = Mapping::new();
  let overrides = match entry.1 {
    Value::Mapping(m) => m,
    Value::Null => &empty,
    _ => {
      return Err(ConfigError::InvalidValue {
        key: output,
        expected: "a mapping",
      });
    }
  };

  let kind = match overrides.get("type") {
    Some(kind) => scalar_string(kind).ok_or(ConfigError::InvalidValue {
      key: format!("{}.type", output),
      expected: "a string",
    })?,
    None => match output.rsplit_once('.') {
      Some((_, ext)) if !ext.contains('/') => ext.to_string(),
      _ => return Err(ConfigError::UnknownKind(output.clone())),
    },
  };

  let mut spec = resolve(&kind, settings, overrides, profile)?;

  let sources = match spec.take("source") {
    Some(value) => source_list(&output, value)?,
    None => Vec::new(),
  };
  if sources.is_empty() {
    return Err(ConfigError::MissingSource(output));
  }

  let depends = match spec.take("depends") {
    None | Some(Value::Null) => Vec::new(),
    Some(value) => string_list(&value).ok_or_else(|| ConfigError::InvalidValue {
      key: format!("{}.depends", output),
      expected: "a string or list of strings",
    })?,
  };

  Ok(AssetDecl {
    output,
    kind,
    sources,
    depends,
    spec,
  })
}

fn source_list(output: &str, value: Value) -> Result<Vec<SourceDecl>, ConfigError> {
  let items = match value {
    Value::Sequence(items) => items,
    Value::Null => return Ok(Vec::new()),
    other => vec![other],
  };

  items
    .into_iter()
    .map(|item| match &item {
      Value::Mapping(m) => m
        .get("raw")
        .and_then(scalar_string)
        .map(SourceDecl::Raw)
        .ok_or_else(|| ConfigError::InvalidValue {
          key: format!("{}.source", output),
          expected: "a path or {raw: text}",
        }),
      other => scalar_string(other)
        .map(SourceDecl::Path)
        .ok_or_else(|| ConfigError::InvalidValue {
          key: format!("{}.source", output),
          expected: "a path or {raw: text}",
        }),
    })
    .collect()
}

fn string_list(value: &Value) -> Option<Vec<String>> {
  match value {
    Value::Sequence(items) => items.iter().map(scalar_string).collect(),
    other => scalar_string(other).map(|s| vec![s]),
  }
}

fn scalar_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}
