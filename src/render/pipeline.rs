use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::palette::PaletteEntry;
use crate::config::RenderConfig;
use crate::effects::composite::{flatten_to_rgb, over_at};
use crate::effects::glow::{composite_glow, render_glow};
use crate::effects::shape::fill_rounded_rect;
use crate::foundation::core::Rgb;
use crate::foundation::error::{PosterError, PosterResult};
use crate::layout::panel::{PanelLayout, PanelTheme};
use crate::paint::color::{Stops, parse_hex_color};
use crate::paint::gradient::{Direction, GradientSpec, render_gradient};
use crate::text::{MarkdownRasterizer, RasterRequest};

/// Background used when a caller does not pick one.
pub const DEFAULT_BACKGROUND: Rgb = Rgb::WHITE;

/// Everything needed to draw one poster, already parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct PosterJob {
    pub stops: Stops,
    pub direction: Direction,
    /// Panel fill.
    pub background: Rgb,
    /// Empty means no panel text; the panel keeps its provisional size.
    pub markdown: String,
}

impl PosterJob {
    /// Parse caller strings against a palette entry; every error here is a config error.
    pub fn from_request(
        entry: &PaletteEntry,
        markdown: impl Into<String>,
        background: Option<&str>,
        direction: Option<&str>,
    ) -> PosterResult<Self> {
        let background = background
            .map(parse_hex_color)
            .transpose()?
            .unwrap_or(DEFAULT_BACKGROUND);
        let direction = direction
            .map(str::parse::<Direction>)
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            stops: entry.stops()?,
            direction,
            background,
            markdown: markdown.into(),
        })
    }
}

/// Finished poster.
#[derive(Clone, Debug)]
pub struct Poster {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PanelLayout,
    pub theme: PanelTheme,
}

impl Poster {
    /// Write the PNG to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> PosterResult<PathBuf> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| PosterError::io(parent, e))?;
        }
        std::fs::write(path, &self.png).map_err(|e| PosterError::io(path, e))?;
        tracing::info!(path = %path.display(), bytes = self.png.len(), "poster written");
        Ok(path.to_path_buf())
    }
}

/// Measure-then-render poster pipeline over a pluggable text rasterizer.
#[derive(Clone)]
pub struct PosterRenderer {
    cfg: Arc<RenderConfig>,
    rasterizer: Arc<dyn MarkdownRasterizer>,
}

impl std::fmt::Debug for PosterRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosterRenderer")
            .field("cfg", &self.cfg)
            .field("rasterizer", &self.rasterizer.name())
            .finish()
    }
}

impl PosterRenderer {
    pub fn new(cfg: Arc<RenderConfig>, rasterizer: Arc<dyn MarkdownRasterizer>) -> Self {
        Self { cfg, rasterizer }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.cfg
    }

    #[tracing::instrument(skip(self, job), fields(direction = %job.direction, stops = job.stops.len()))]
    pub fn render(&self, job: &PosterJob) -> PosterResult<Poster> {
        let cfg = self.cfg.as_ref();
        cfg.validate()?;
        if job.stops.is_empty() {
            return Err(PosterError::config("palette has no colors"));
        }

        let theme = PanelTheme::for_background(job.background);
        let provisional = PanelLayout::provisional(cfg);

        let text = if job.markdown.trim().is_empty() {
            None
        } else {
            let req = RasterRequest {
                markdown: job.markdown.clone(),
                width: provisional.content_box().width,
                text_color: theme.text,
                background: theme.background,
            };
            Some(self.rasterizer.rasterize(&req)?)
        };

        let layout = match &text {
            Some(layer) => PanelLayout::measured(cfg, layer.height()),
            None => provisional,
        };
        if layout.clamped {
            tracing::warn!(
                canvas_height = cfg.canvas.height,
                "text taller than the canvas, panel clamped and text cropped"
            );
        }
        tracing::debug!(panel = ?layout.panel, glow = ?layout.glow, "panel layout");

        let mut canvas = render_gradient(&GradientSpec {
            stops: job.stops.clone(),
            direction: job.direction,
            canvas: cfg.canvas,
        })?;

        let glow = render_glow(cfg, layout.glow, theme.glow_tint)?;
        composite_glow(&mut canvas, &glow)?;
        fill_rounded_rect(&mut canvas, layout.panel, theme.background.to_rgba(255));

        if let Some(layer) = text {
            let content = layout.content_box();
            let image = if layer.image.height() > content.height {
                image::imageops::crop_imm(&layer.image, 0, 0, layer.image.width(), content.height)
                    .to_image()
            } else {
                layer.image
            };
            over_at(&mut canvas, &image, content.x, content.y);
        }

        let rgb = flatten_to_rgb(&canvas);
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| PosterError::Other(anyhow::anyhow!("png encode failed: {e}")))?;

        Ok(Poster {
            png,
            width: cfg.canvas.width,
            height: cfg.canvas.height,
            layout,
            theme,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;
    use crate::text::TextLayer;

    /// Solid block of the requested background, `height` rows tall.
    struct BlockRasterizer {
        height: u32,
    }

    impl MarkdownRasterizer for BlockRasterizer {
        fn rasterize(&self, req: &RasterRequest) -> PosterResult<TextLayer> {
            let mut image = image::RgbaImage::from_pixel(
                req.width,
                self.height,
                image::Rgba(req.background.to_rgba(255)),
            );
            image.put_pixel(0, 0, image::Rgba(req.text_color.to_rgba(255)));
            Ok(TextLayer { image })
        }

        fn name(&self) -> &'static str {
            "block"
        }
    }

    fn small_renderer(height: u32) -> PosterRenderer {
        let mut cfg = RenderConfig::with_canvas(Canvas {
            width: 200,
            height: 300,
        });
        cfg.corner_radius = 10;
        cfg.glow_blur_sigma = 2.0;
        PosterRenderer::new(Arc::new(cfg), Arc::new(BlockRasterizer { height }))
    }

    fn entry(colors: &[&str]) -> PaletteEntry {
        PaletteEntry {
            id: 7,
            name: "t".into(),
            colors: colors.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn decode(poster: &Poster) -> image::RgbImage {
        image::load_from_memory(&poster.png).unwrap().into_rgb8()
    }

    #[test]
    fn job_parsing_rejects_bad_inputs_and_defaults_the_rest() {
        let e = entry(&["#000000", "#FFFFFF"]);
        let job = PosterJob::from_request(&e, "", None, None).unwrap();
        assert_eq!(job.background, Rgb::WHITE);
        assert_eq!(job.direction, Direction::BottomRight);

        let err = PosterJob::from_request(&e, "", Some("red"), None).unwrap_err();
        assert!(err.is_client_error());
        let err = PosterJob::from_request(&e, "", None, Some("up")).unwrap_err();
        assert!(err.is_client_error());
        let err = PosterJob::from_request(&entry(&[]), "", None, None).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn text_height_drives_panel_height() {
        let r = small_renderer(40);
        let job = PosterJob::from_request(&entry(&["#000000"]), "x", None, None).unwrap();
        let poster = r.render(&job).unwrap();
        assert_eq!(poster.layout.panel.rect.height, 60);
        assert_eq!(poster.layout.panel.rect.y, 120);
        assert_eq!(poster.theme.text, Rgb::new(0x33, 0x33, 0x33));

        let img = decode(&poster);
        assert_eq!(img.dimensions(), (200, 300));
        // Text layer origin sits one radius inside the panel corner.
        let content = poster.layout.content_box();
        assert_eq!(
            img.get_pixel(content.x as u32, content.y as u32).0,
            [0x33, 0x33, 0x33]
        );
        assert_eq!(img.get_pixel(100, 150).0, [255, 255, 255]);
    }

    #[test]
    fn oversized_text_clamps_panel_to_canvas() {
        let r = small_renderer(1000);
        let job = PosterJob::from_request(&entry(&["#000000"]), "x", None, None).unwrap();
        let poster = r.render(&job).unwrap();
        assert!(poster.layout.clamped);
        assert_eq!(poster.layout.panel.rect.height, 300);
        assert_eq!(poster.layout.panel.rect.y, 0);
    }

    #[test]
    fn save_creates_parent_dirs() {
        let r = small_renderer(10);
        let job = PosterJob::from_request(&entry(&["#102030"]), "", None, None).unwrap();
        let poster = r.render(&job).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/out.png");
        poster.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), poster.png);
    }
}
