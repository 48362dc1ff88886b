use std::path::PathBuf;
use std::time::Duration;

use crate::foundation::core::Canvas;
use crate::foundation::error::{PosterError, PosterResult};

/// Fixed geometry of one poster.
///
/// [`RenderConfig::default`] is the reference 1080x1920 layout; the fields exist so tests and
/// alternative output sizes can scale the same pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub canvas: Canvas,
    /// Panel corner radius in pixels.
    pub corner_radius: u32,
    /// Provisional panel size as a fraction of the canvas, on both axes.
    pub panel_ratio: f64,
    /// Total growth of the glow rectangle over the panel (split evenly per side).
    pub glow_outset: u32,
    /// Extra corner radius of the glow over the panel.
    pub glow_radius_extra: u32,
    /// Straight alpha of the glow tint before blurring.
    pub glow_alpha: u8,
    /// Gaussian sigma of the glow blur.
    pub glow_blur_sigma: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 1080,
                height: 1920,
            },
            corner_radius: 50,
            panel_ratio: 0.8,
            glow_outset: 20,
            glow_radius_extra: 10,
            glow_alpha: 100,
            glow_blur_sigma: 10.0,
        }
    }
}

impl RenderConfig {
    /// Reference layout on a different canvas.
    pub fn with_canvas(canvas: Canvas) -> Self {
        Self {
            canvas,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> PosterResult<()> {
        Canvas::new(self.canvas.width, self.canvas.height)?;
        if !(self.panel_ratio > 0.0 && self.panel_ratio <= 1.0) {
            return Err(PosterError::config(format!(
                "panel_ratio must be in (0, 1], got {}",
                self.panel_ratio
            )));
        }
        let panel_w = (f64::from(self.canvas.width) * self.panel_ratio) as u32;
        let panel_h = (f64::from(self.canvas.height) * self.panel_ratio) as u32;
        if 2 * self.corner_radius >= panel_w.min(panel_h) {
            return Err(PosterError::config(
                "corner_radius leaves no room for panel content",
            ));
        }
        if !self.glow_outset.is_multiple_of(2) {
            return Err(PosterError::config("glow_outset must be even"));
        }
        if !self.glow_blur_sigma.is_finite() || self.glow_blur_sigma < 0.0 {
            return Err(PosterError::config("glow_blur_sigma must be finite and >= 0"));
        }
        Ok(())
    }

    /// Kernel half-width for the glow blur (three sigmas).
    pub fn glow_blur_radius(&self) -> u32 {
        (self.glow_blur_sigma * 3.0).ceil() as u32
    }
}

/// Which markdown rasterizer strategy renders the text layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RasterizerKind {
    /// In-process shaping and glyph drawing.
    #[default]
    Glyph,
    /// Headless Chromium screenshot of an HTML rendition.
    Browser,
}

/// Font and engine selection for the text layer.
#[derive(Clone, Debug)]
pub struct RasterizerConfig {
    pub kind: RasterizerKind,
    /// Candidate font files, first existing one wins.
    pub font_paths: Vec<PathBuf>,
    /// Headless browser executable (browser strategy only).
    pub browser: PathBuf,
    /// Upper bound for one browser run, launch to exit.
    pub browser_timeout: Duration,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            kind: RasterizerKind::Glyph,
            font_paths: default_font_paths(),
            browser: PathBuf::from("chromium"),
            browser_timeout: Duration::from_secs(30),
        }
    }
}

/// Fonts with broad CJK coverage on common desktop and server installs, then Latin and emoji.
pub fn default_font_paths() -> Vec<PathBuf> {
    [
        "/System/Library/Fonts/PingFang.ttc",
        "/System/Library/Fonts/STHeiti Light.ttc",
        "C:\\Windows\\Fonts\\msyh.ttc",
        "C:\\Windows\\Fonts\\simsun.ttc",
        "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "JetBrainsMono-Regular.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/System/Library/Fonts/Apple Color Emoji.ttc",
        "C:\\Windows\\Fonts\\seguiemj.ttf",
        "/usr/share/fonts/truetype/noto/NotoColorEmoji.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

/// Where palettes come from and where finished posters go.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub palette_path: PathBuf,
    pub output_dir: PathBuf,
    /// Write every rendered PNG under `output_dir` in addition to returning the bytes.
    pub persist_outputs: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            palette_path: PathBuf::from("color_zh.json"),
            output_dir: PathBuf::from("gradient_images"),
            persist_outputs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_config_is_valid() {
        let cfg = RenderConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.glow_blur_radius(), 30);
    }

    #[test]
    fn rejects_bad_geometry() {
        let mut cfg = RenderConfig::default();
        cfg.panel_ratio = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = RenderConfig::with_canvas(Canvas {
            width: 100,
            height: 100,
        });
        assert!(cfg.validate().is_err(), "radius 50 cannot fit an 80px panel");
        cfg.corner_radius = 10;
        cfg.validate().unwrap();

        cfg.glow_outset = 3;
        assert!(cfg.validate().is_err());
    }
}
