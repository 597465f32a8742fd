use std::ffi::OsStr;

use super::source::read_file;
use super::{Asset, AssetHandler, GenerateError, Source};
use crate::config::{ConfigError, Spec};
use crate::engine::emit::BuildContext;

/// Scripts: CoffeeScript is compiled, everything else is read verbatim, and
/// the result is optionally minified with uglifyjs.
#[derive(Debug, Clone)]
pub struct JsHandler {
  bare: bool,
  compressed: bool,
  /// Extra uglifyjs arguments.
  uglify: Vec<String>,
}

impl JsHandler {
  pub fn from_spec(spec: &Spec) -> Result<Self, ConfigError> {
    Ok(Self {
      bare: spec.flag("bare"),
      compressed: spec.flag("compressed"),
      uglify: spec.args("uglify"),
    })
  }

  fn minify(&self) -> bool {
    self.compressed || !self.uglify.is_empty()
  }
}

impl AssetHandler for JsHandler {
  fn generate(&self, asset: &Asset, ctx: &mut BuildContext<'_>) -> Result<(), GenerateError> {
    let tools = ctx.tools();
    let mut output = Vec::new();

    for source in &asset.sources {
      match source {
        Source::Raw(text) => output.extend_from_slice(text.as_bytes()),
        Source::File(path) if source.has_extension("coffee") => {
          let mut args: Vec<&OsStr> = vec!["-p".as_ref()];
          if self.bare {
            args.push("-b".as_ref());
          }
          args.push(path.as_os_str());
          output.extend(tools.run("coffee", args)?);
        }
        Source::File(path) => output.extend(read_file(path)?),
      }
    }

    if self.minify() {
      let minified = tools.pipe("uglifyjs", &self.uglify, &output)?;
      if !minified.stderr.is_empty() {
        return Err(GenerateError::Uglify(
          String::from_utf8_lossy(&minified.stderr).trim_end().to_string(),
        ));
      }
      output = minified.stdout;
    }

    ctx.emit(&asset.path, &output, "")?;
    Ok(())
  }
}
