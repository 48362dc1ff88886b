//! Markdown to premultiplied RGBA text layers.

pub mod browser;
pub mod fonts;
pub mod glyph;
pub mod markdown;

use std::sync::Arc;

use image::RgbaImage;

use crate::config::{RasterizerConfig, RasterizerKind};
use crate::foundation::core::Rgb;
use crate::foundation::error::PosterResult;

pub use browser::BrowserRasterizer;
pub use fonts::{FontSet, FontSource};
pub use glyph::GlyphRasterizer;

/// What to draw and how wide the content box is.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterRequest {
    pub markdown: String,
    /// Layer width in pixels; the layer height is whatever the content needs.
    pub width: u32,
    pub text_color: Rgb,
    /// Opaque fill behind the text, normally the panel color.
    pub background: Rgb,
}

/// Premultiplied RGBA8 rendition of one markdown document.
#[derive(Clone, Debug)]
pub struct TextLayer {
    pub image: RgbaImage,
}

impl TextLayer {
    /// Natural height of the rendered content.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Strategy that turns markdown into pixels at a fixed width.
pub trait MarkdownRasterizer: Send + Sync {
    fn rasterize(&self, req: &RasterRequest) -> PosterResult<TextLayer>;

    fn name(&self) -> &'static str;
}

/// Build the configured strategy.
///
/// A missing font only fails once a document with text is rasterized.
pub fn create_rasterizer(cfg: &RasterizerConfig) -> Arc<dyn MarkdownRasterizer> {
    match cfg.kind {
        RasterizerKind::Glyph => {
            let fonts = FontSet::discover(&cfg.font_paths);
            if fonts.is_empty() {
                tracing::warn!("no font found, text rendering will fail");
            }
            Arc::new(GlyphRasterizer::new(fonts))
        }
        RasterizerKind::Browser => {
            let font = match FontSource::discover(&cfg.font_paths) {
                Ok(font) => Some(font),
                Err(err) => {
                    tracing::warn!(error = %err, "no font found, using the browser default");
                    None
                }
            };
            Arc::new(BrowserRasterizer::new(
                cfg.browser.clone(),
                cfg.browser_timeout,
                font,
            ))
        }
    }
}
