use super::{Asset, AssetHandler, GenerateError};
use crate::engine::emit::BuildContext;

/// Concatenates sources byte for byte.
#[derive(Debug, Default)]
pub struct BinaryHandler;

impl AssetHandler for BinaryHandler {
  fn generate(&self, asset: &Asset, ctx: &mut BuildContext<'_>) -> Result<(), GenerateError> {
    let mut content = Vec::new();
    for source in &asset.sources {
      content.extend(source.read()?);
    }
    ctx.emit(&asset.path, &content, "")?;
    Ok(())
  }
}
