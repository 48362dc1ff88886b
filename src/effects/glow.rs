use image::RgbaImage;

use crate::config::RenderConfig;
use crate::effects::blur::blur_rgba8_premul;
use crate::effects::composite::over_in_place;
use crate::effects::shape::{canvas_of, fill_rounded_rect};
use crate::foundation::core::Rgb;
use crate::foundation::error::{PosterError, PosterResult};
use crate::layout::panel::RoundedBounds;

/// Canvas-sized premultiplied layer holding the blurred halo.
#[derive(Clone, Debug)]
pub struct GlowLayer {
    pub image: RgbaImage,
}

/// Draw the glow rectangle in `tint` at the configured alpha and blur it.
#[tracing::instrument(skip(cfg))]
pub fn render_glow(cfg: &RenderConfig, glow: RoundedBounds, tint: Rgb) -> PosterResult<GlowLayer> {
    let canvas = cfg.canvas;
    let mut image = RgbaImage::new(canvas.width, canvas.height);
    fill_rounded_rect(&mut image, glow, tint.to_premul_rgba(cfg.glow_alpha));

    let radius = cfg.glow_blur_radius();
    // Outside the padded box every sample is transparent, so blurring only this region matches
    // a whole-layer blur.
    let Some((x0, y0, x1, y1)) = glow.rect.outset(radius).clip_to(canvas) else {
        return Ok(GlowLayer { image });
    };
    let (w, h) = (x1 - x0, y1 - y0);
    let region = copy_region(&image, x0, y0, w, h);
    let blurred = blur_rgba8_premul(&region, w, h, radius, cfg.glow_blur_sigma)?;
    write_region(&mut image, x0, y0, w, &blurred);
    Ok(GlowLayer { image })
}

/// Alpha-blend the glow onto an opaque canvas.
pub fn composite_glow(canvas: &mut RgbaImage, glow: &GlowLayer) -> PosterResult<()> {
    if canvas_of(canvas) != canvas_of(&glow.image) {
        return Err(PosterError::Other(anyhow::anyhow!(
            "glow layer {}x{} does not match canvas {}x{}",
            glow.image.width(),
            glow.image.height(),
            canvas.width(),
            canvas.height()
        )));
    }
    over_in_place(canvas, glow.image.as_raw())
}

fn copy_region(img: &RgbaImage, x0: u32, y0: u32, w: u32, h: u32) -> Vec<u8> {
    let stride = img.width() as usize * 4;
    let span = w as usize * 4;
    let mut out = Vec::with_capacity(span * h as usize);
    for y in y0 as usize..(y0 + h) as usize {
        let off = y * stride + x0 as usize * 4;
        out.extend_from_slice(&img.as_raw()[off..off + span]);
    }
    out
}

fn write_region(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, src: &[u8]) {
    let stride = img.width() as usize * 4;
    let span = w as usize * 4;
    let buf: &mut [u8] = img;
    for (row, chunk) in src.chunks_exact(span).enumerate() {
        let off = (y0 as usize + row) * stride + x0 as usize * 4;
        buf[off..off + span].copy_from_slice(chunk);
    }
}
