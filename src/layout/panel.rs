use crate::config::RenderConfig;
use crate::foundation::core::{Canvas, PixelRect, Rgb};

/// Channel sum above which a panel counts as light.
pub const LIGHT_CHANNEL_SUM: u32 = 600;
/// Body text on light panels.
pub const DARK_TEXT: Rgb = Rgb::new(0x33, 0x33, 0x33);

/// Position and corner radius of a rounded rectangle in canvas space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundedBounds {
    pub rect: PixelRect,
    pub radius: u32,
}

/// Resolved panel placement for one render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelLayout {
    pub panel: RoundedBounds,
    pub glow: RoundedBounds,
    /// Set when the measured content did not fit and the panel was clamped to the canvas.
    pub clamped: bool,
}

impl PanelLayout {
    /// First pass: the fixed-ratio panel, used without text and as the width hint for layout.
    pub fn provisional(cfg: &RenderConfig) -> Self {
        let Canvas { width, height } = cfg.canvas;
        let w = (f64::from(width) * cfg.panel_ratio) as u32;
        let h = (f64::from(height) * cfg.panel_ratio) as u32;
        Self::centered(cfg, w, h, false)
    }

    /// Second pass: panel height follows the measured text height.
    ///
    /// Width and horizontal position never change between passes.
    pub fn measured(cfg: &RenderConfig, content_height: u32) -> Self {
        let provisional = Self::provisional(cfg);
        let wanted = content_height.saturating_add(2 * cfg.corner_radius);
        let h = wanted.min(cfg.canvas.height);
        let layout = Self::centered(cfg, provisional.panel.rect.width, h, wanted > h);
        debug_assert_eq!(layout.panel.rect.x, provisional.panel.rect.x);
        layout
    }

    fn centered(cfg: &RenderConfig, w: u32, h: u32, clamped: bool) -> Self {
        let canvas = cfg.canvas;
        let panel = RoundedBounds {
            rect: centered_rect(canvas, w, h),
            radius: cfg.corner_radius,
        };
        let glow = RoundedBounds {
            rect: centered_rect(canvas, w + cfg.glow_outset, h + cfg.glow_outset),
            radius: cfg.corner_radius + cfg.glow_radius_extra,
        };
        Self {
            panel,
            glow,
            clamped,
        }
    }

    /// Content box handed to the rasterizer: the panel inset by its radius on every side.
    pub fn content_box(&self) -> PixelRect {
        let PixelRect {
            x,
            y,
            width,
            height,
        } = self.panel.rect;
        let r = self.panel.radius;
        PixelRect {
            x: x + r as i32,
            y: y + r as i32,
            width: width.saturating_sub(2 * r),
            height: height.saturating_sub(2 * r),
        }
    }
}

fn centered_rect(canvas: Canvas, w: u32, h: u32) -> PixelRect {
    // Floor division, so oversize rectangles center the same way as in-bounds ones.
    let x = (i64::from(canvas.width) - i64::from(w)).div_euclid(2);
    let y = (i64::from(canvas.height) - i64::from(h)).div_euclid(2);
    PixelRect {
        x: x as i32,
        y: y as i32,
        width: w,
        height: h,
    }
}

/// Text color and glow tint picked from the panel background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelTheme {
    pub background: Rgb,
    pub text: Rgb,
    pub glow_tint: Rgb,
}

impl PanelTheme {
    /// Binary split on the plain channel sum, not perceptual luminance.
    pub fn for_background(background: Rgb) -> Self {
        if background.channel_sum() > LIGHT_CHANNEL_SUM {
            Self {
                background,
                text: DARK_TEXT,
                glow_tint: Rgb::WHITE,
            }
        } else {
            Self {
                background,
                text: Rgb::WHITE,
                glow_tint: Rgb::BLACK,
            }
        }
    }

    pub fn is_light(&self) -> bool {
        self.background.channel_sum() > LIGHT_CHANNEL_SUM
    }
}
