//! Stylesheets.
//!
//! Sources are compiled by extension (`.sass`/`.scss`, `.less`, `.styl`) or
//! read verbatim, then concatenated. When an embed root is configured, every
//! `embed("path")` reference is rewritten to a `url()` or an inline data URI.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::bytes::Regex;
use tracing::warn;

use super::source::read_file;
use super::{Asset, AssetHandler, GenerateError, Source, ToolRunner};
use crate::config::{ConfigError, Spec};
use crate::engine::emit::{BuildContext, split_logical};
use crate::util::hash::hash_bytes;

static EMBED: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"embed\("([^\)]*)"\)"#).expect("embed pattern is valid"));

#[derive(Debug, Clone)]
struct EmbedSettings {
  /// Directory embedded files are looked up in, relative to the config.
  root: String,
  url_base: Option<String>,
  url_template: String,
  /// Largest base64 payload inlined; `None` inlines everything.
  data_limit: Option<u64>,
  extension: String,
  only: bool,
}

#[derive(Debug, Clone)]
pub struct CssHandler {
  compressed: bool,
  /// Filename suffix of the flipped variant, when one is produced.
  bidi: Option<String>,
  embed: Option<EmbedSettings>,
}

impl CssHandler {
  pub fn from_spec(spec: &Spec) -> Result<Self, ConfigError> {
    let bidi = spec
      .flag("bidi")
      .then(|| spec.str("bidi.extension").unwrap_or(".rtl").to_string());

    let embed = match spec.str("embed.path.root").filter(|root| !root.is_empty()) {
      None => None,
      Some(root) => Some(EmbedSettings {
        root: root.to_string(),
        url_base: spec.str("embed.url.base").filter(|b| !b.is_empty()).map(str::to_string),
        url_template: spec
          .str("embed.url.template")
          .unwrap_or("{url_base}{prefix}/{hash}{filename}")
          .to_string(),
        data_limit: spec.u64("embed.data_limit")?.filter(|&limit| limit > 0),
        extension: spec.str("embed.extension").unwrap_or(".data").to_string(),
        only: spec.flag("embed.only"),
      }),
    };

    Ok(Self {
      compressed: spec.flag("compressed"),
      bidi,
      embed,
    })
  }

  fn compile(&self, sources: &[Source], flip: bool, tools: &ToolRunner) -> Result<Vec<u8>, GenerateError> {
    let mut output = Vec::new();
    for source in sources {
      let path = match source {
        Source::Raw(text) => {
          output.extend_from_slice(text.as_bytes());
          continue;
        }
        Source::File(path) => path,
      };

      if source.has_extension("sass") || source.has_extension("scss") {
        let mut args: Vec<&OsStr> = Vec::new();
        if source.has_extension("scss") {
          args.push("--scss".as_ref());
        }
        if flip {
          args.push("--flip".as_ref());
        }
        if self.compressed {
          args.push("--style".as_ref());
          args.push("compressed".as_ref());
        }
        args.push(path.as_os_str());
        output.extend(tools.run("sass", args)?);
      } else if source.has_extension("less") {
        output.extend(tools.run("lessc", [path])?);
      } else if source.has_extension("styl") {
        output.extend(self.stylus(path, tools)?);
      } else {
        output.extend(read_file(path)?);
      }
    }
    Ok(output)
  }

  /// stylus only writes to stdout when reading stdin, so compile a scratch
  /// copy and read the `.css` it leaves next to it.
  fn stylus(&self, path: &Path, tools: &ToolRunner) -> Result<Vec<u8>, GenerateError> {
    let scratch_err = |source| GenerateError::Read {
      path: path.to_path_buf(),
      source,
    };

    let scratch = tempfile::tempdir().map_err(scratch_err)?;
    let copy = scratch.path().join(path.file_name().unwrap_or(path.as_os_str()));
    std::fs::copy(path, &copy).map_err(scratch_err)?;

    let mut args = Vec::new();
    if self.compressed {
      args.push(PathBuf::from("--compress"));
    }
    args.push(copy.clone());
    tools.run("stylus", args)?;

    read_file(&copy.with_extension("css"))
  }
}

impl AssetHandler for CssHandler {
  fn generate(&self, asset: &Asset, ctx: &mut BuildContext<'_>) -> Result<(), GenerateError> {
    let mut resolver = self
      .embed
      .as_ref()
      .map(|settings| EmbedResolver::new(settings, ctx.base_dir(), ctx.hashed(), &asset.path));

    let mut variants = vec![String::new()];
    variants.extend(self.bidi.clone());

    for suffix in &variants {
      let css = self.compile(&asset.sources, !suffix.is_empty(), ctx.tools())?;

      let Some(resolver) = resolver.as_mut() else {
        ctx.emit(&asset.path, &css, suffix)?;
        continue;
      };

      if resolver.settings.url_base.is_some() {
        let inlined = resolver.substitute(&css, EmbedMode::Data)?;
        if resolver.settings.only {
          ctx.emit(&asset.path, &inlined, suffix)?;
          continue;
        }
        let extension = format!("{}{}", resolver.settings.extension, suffix);
        ctx.emit(&asset.path, &inlined, &extension)?;
      }

      let linked = resolver.substitute(&css, EmbedMode::Url)?;
      ctx.emit(&asset.path, &linked, suffix)?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmbedMode {
  Url,
  Data,
}

/// Resolves `embed()` references for one `generate()` call.
///
/// Each referenced file is read at most once; a missing file is warned about
/// once and then degrades to an unversioned `url()`.
struct EmbedResolver<'a> {
  settings: &'a EmbedSettings,
  root: PathBuf,
  hashed: bool,
  asset: &'a str,
  cache: HashMap<String, Option<Vec<u8>>>,
}

impl<'a> EmbedResolver<'a> {
  fn new(settings: &'a EmbedSettings, base_dir: &Path, hashed: bool, asset: &'a str) -> Self {
    Self {
      settings,
      root: base_dir.join(&settings.root),
      hashed,
      asset,
      cache: HashMap::new(),
    }
  }

  fn substitute(&mut self, css: &[u8], mode: EmbedMode) -> Result<Vec<u8>, GenerateError> {
    let mut output = Vec::with_capacity(css.len());
    let mut last = 0;

    for caps in EMBED.captures_iter(css) {
      let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
        continue;
      };
      output.extend_from_slice(&css[last..whole.start()]);
      let path = String::from_utf8_lossy(path.as_bytes()).into_owned();
      let replacement = match mode {
        EmbedMode::Url => self.url_reference(&path),
        EmbedMode::Data => self.data_reference(&path)?,
      };
      output.extend_from_slice(replacement.as_bytes());
      last = whole.end();
    }

    output.extend_from_slice(&css[last..]);
    Ok(output)
  }

  fn url_reference(&mut self, path: &str) -> String {
    let data = self.file(path).map(<[u8]>::to_vec);
    format!("url(\"{}\")", self.url(path, data.as_deref()))
  }

  fn data_reference(&mut self, path: &str) -> Result<String, GenerateError> {
    let content_type = content_type(path).ok_or_else(|| GenerateError::UnknownContentType(path.to_string()))?;
    let Some(data) = self.file(path).map(<[u8]>::to_vec) else {
      return Ok(format!("url(\"{}\")", self.url(path, None)));
    };

    let encoded = STANDARD.encode(&data);
    if let Some(limit) = self.settings.data_limit
      && encoded.len() as u64 > limit
    {
      return Ok(format!("url(\"{}\")", self.url(path, Some(&data))));
    }
    Ok(format!("url(\"data:{};base64,{}\")", content_type, encoded))
  }

  fn file(&mut self, path: &str) -> Option<&[u8]> {
    if !self.cache.contains_key(path) {
      let full = self.root.join(path);
      let data = match std::fs::read(&full) {
        Ok(data) => Some(data),
        Err(_) => {
          warn!(file = %full.display(), asset = self.asset, "couldn't find embedded file");
          None
        }
      };
      self.cache.insert(path.to_string(), data);
    }
    self.cache.get(path).and_then(|data| data.as_deref())
  }

  fn url(&self, path: &str, data: Option<&[u8]>) -> String {
    let hash = match data {
      Some(data) if self.hashed => format!("{}-", hash_bytes(data)),
      _ => String::new(),
    };
    let (prefix, filename) = split_logical(path);
    self
      .settings
      .url_template
      .replace("{url_base}", self.settings.url_base.as_deref().unwrap_or(""))
      .replace("{prefix}", prefix)
      .replace("{hash}", &hash)
      .replace("{filename}", filename)
  }
}

/// Content type of an embeddable file, by extension.
pub fn content_type(path: &str) -> Option<&'static str> {
  let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
  let content_type = match ext.as_str() {
    "png" => "image/png",
    "gif" => "image/gif",
    "jpg" | "jpeg" | "jpe" => "image/jpeg",
    "svg" => "image/svg+xml",
    "webp" => "image/webp",
    "bmp" => "image/bmp",
    "ico" => "image/vnd.microsoft.icon",
    "tif" | "tiff" => "image/tiff",
    "woff" => "font/woff",
    "woff2" => "font/woff2",
    "ttf" => "font/ttf",
    "otf" => "font/otf",
    "eot" => "application/vnd.ms-fontobject",
    "css" => "text/css",
    "js" => "application/javascript",
    "json" => "application/json",
    "html" | "htm" => "text/html",
    "txt" => "text/plain",
    "xml" => "text/xml",
    _ => return None,
  };
  Some(content_type)
}
