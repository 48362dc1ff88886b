use crate::foundation::error::{PosterError, PosterResult};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas.
    ///
    /// Both axes must be at least 2 pixels: the scanline gradient modes divide by `size - 1`.
    pub fn new(width: u32, height: u32) -> PosterResult<Self> {
        if width < 2 || height < 2 {
            return Err(PosterError::config(format!(
                "canvas must be at least 2x2 pixels, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }
}

/// Straight (non-premultiplied) 8-bit RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format as `#RRGGBB` (uppercase).
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn channel_sum(self) -> u32 {
        u32::from(self.r) + u32::from(self.g) + u32::from(self.b)
    }

    pub fn to_rgba(self, a: u8) -> [u8; 4] {
        [self.r, self.g, self.b, a]
    }

    /// Premultiplied RGBA8 with the given straight alpha.
    pub fn to_premul_rgba(self, a: u8) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        [premul(self.r, a), premul(self.g, a), premul(self.b, a), a]
    }
}

/// Axis-aligned integer rectangle in canvas pixel space.
///
/// `x`/`y` may be negative (the glow outset can cross the canvas edge).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(self) -> i32 {
        self.y + self.height as i32
    }

    /// Doubled center point, exact in integers.
    pub fn center_x2(self) -> (i64, i64) {
        (
            2 * i64::from(self.x) + i64::from(self.width),
            2 * i64::from(self.y) + i64::from(self.height),
        )
    }

    /// Return `true` when the rectangle lies fully inside `canvas`.
    pub fn within(self, canvas: Canvas) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= canvas.width as i32
            && self.bottom() <= canvas.height as i32
    }

    /// Grow by `d` on every side.
    pub fn outset(self, d: u32) -> Self {
        Self {
            x: self.x - d as i32,
            y: self.y - d as i32,
            width: self.width + 2 * d,
            height: self.height + 2 * d,
        }
    }

    /// Intersection with the canvas as half-open pixel ranges `(x0, y0, x1, y1)`.
    pub fn clip_to(self, canvas: Canvas) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(canvas.width as i32);
        let y1 = self.bottom().min(canvas.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_rejects_degenerate_axes() {
        assert!(Canvas::new(1, 1920).is_err());
        assert!(Canvas::new(1080, 1).is_err());
        assert!(Canvas::new(1080, 1920).is_ok());
    }

    #[test]
    fn premul_scales_channels_by_alpha() {
        assert_eq!(Rgb::WHITE.to_premul_rgba(100), [100, 100, 100, 100]);
        assert_eq!(Rgb::new(10, 20, 30).to_premul_rgba(255), [10, 20, 30, 255]);
        assert_eq!(Rgb::WHITE.to_premul_rgba(0), [0, 0, 0, 0]);
    }

    #[test]
    fn clip_handles_negative_origin() {
        let canvas = Canvas {
            width: 10,
            height: 10,
        };
        let r = PixelRect {
            x: -3,
            y: 8,
            width: 5,
            height: 5,
        };
        assert_eq!(r.clip_to(canvas), Some((0, 8, 2, 10)));
        assert!(!r.within(canvas));

        let off = PixelRect {
            x: 20,
            y: 0,
            width: 2,
            height: 2,
        };
        assert_eq!(off.clip_to(canvas), None);
    }

    #[test]
    fn outset_keeps_center() {
        let r = PixelRect {
            x: 108,
            y: 192,
            width: 864,
            height: 1536,
        };
        assert_eq!(r.outset(10).center_x2(), r.center_x2());
    }
}
