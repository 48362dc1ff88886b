use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use rayon::prelude::*;

use crate::foundation::core::{Canvas, Rgb};
use crate::foundation::error::{PosterError, PosterResult};
use crate::paint::color::{Interpolator, Stops};

/// Gradient direction across the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Top to bottom, one color per row.
    Vertical,
    /// Left to right, one color per column.
    Horizontal,
    /// Top-left to bottom-right, averaged axis fractions per pixel.
    Diagonal,
    /// Toward the bottom-right corner. Shares the `Diagonal` formula.
    #[default]
    #[serde(alias = "corner")]
    BottomRight,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Vertical,
        Direction::Horizontal,
        Direction::Diagonal,
        Direction::BottomRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Vertical => "vertical",
            Direction::Horizontal => "horizontal",
            Direction::Diagonal => "diagonal",
            Direction::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = PosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertical" => Ok(Direction::Vertical),
            "horizontal" => Ok(Direction::Horizontal),
            "diagonal" => Ok(Direction::Diagonal),
            "bottom-right" | "corner" => Ok(Direction::BottomRight),
            other => Err(PosterError::config(format!(
                "Invalid direction \"{other}\". Must be one of: vertical, horizontal, diagonal, bottom-right"
            ))),
        }
    }
}

/// Everything needed to paint the background.
#[derive(Clone, Debug)]
pub struct GradientSpec {
    pub stops: Stops,
    pub direction: Direction,
    pub canvas: Canvas,
}

/// Paint an opaque gradient canvas.
#[tracing::instrument(skip(spec), fields(direction = %spec.direction, w = spec.canvas.width, h = spec.canvas.height))]
pub fn render_gradient(spec: &GradientSpec) -> PosterResult<RgbaImage> {
    let Canvas { width, height } = Canvas::new(spec.canvas.width, spec.canvas.height)?;
    let lerp = Interpolator::new(&spec.stops)?;
    let (w, h) = (width as usize, height as usize);
    let row_bytes = w * 4;
    let mut bytes = vec![0u8; row_bytes * h];

    match spec.direction {
        Direction::Vertical => {
            let h1 = f64::from(height - 1);
            bytes
                .par_chunks_exact_mut(row_bytes)
                .enumerate()
                .for_each(|(y, row)| fill_row(row, lerp.at(y as f64 / h1)));
        }
        Direction::Horizontal => {
            let w1 = f64::from(width - 1);
            let column: Vec<[u8; 4]> = (0..w)
                .map(|x| lerp.at(x as f64 / w1).to_rgba(255))
                .collect();
            bytes
                .par_chunks_exact_mut(row_bytes)
                .for_each(|row| copy_row(row, &column));
        }
        Direction::Diagonal | Direction::BottomRight => {
            let (wf, hf) = (f64::from(width), f64::from(height));
            let dx: Vec<f64> = (0..w).map(|x| x as f64 / wf).collect();
            bytes
                .par_chunks_exact_mut(row_bytes)
                .enumerate()
                .for_each(|(y, row)| {
                    let dy = y as f64 / hf;
                    for (px, &dx) in row.chunks_exact_mut(4).zip(&dx) {
                        px.copy_from_slice(&lerp.at((dx + dy) / 2.0).to_rgba(255));
                    }
                });
        }
    }

    RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| PosterError::Other(anyhow::anyhow!("gradient buffer size mismatch")))
}

fn fill_row(row: &mut [u8], c: Rgb) {
    let px = c.to_rgba(255);
    for dst in row.chunks_exact_mut(4) {
        dst.copy_from_slice(&px);
    }
}

fn copy_row(row: &mut [u8], column: &[[u8; 4]]) {
    for (dst, px) in row.chunks_exact_mut(4).zip(column) {
        dst.copy_from_slice(px);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::color::interpolate;
    use smallvec::smallvec;

    fn spec(direction: Direction, w: u32, h: u32) -> GradientSpec {
        GradientSpec {
            stops: smallvec![Rgb::new(255, 0, 0), Rgb::new(0, 128, 255), Rgb::new(20, 200, 40)],
            direction,
            canvas: Canvas {
                width: w,
                height: h,
            },
        }
    }

    fn px(img: &RgbaImage, x: u32, y: u32) -> Rgb {
        let p = img.get_pixel(x, y).0;
        Rgb::new(p[0], p[1], p[2])
    }

    #[test]
    fn direction_parses_names_and_alias() {
        for d in Direction::ALL {
            assert_eq!(d.as_str().parse::<Direction>().unwrap(), d);
        }
        assert_eq!("corner".parse::<Direction>().unwrap(), Direction::BottomRight);
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(PosterError::Config(_))
        ));
        let d: Direction = serde_json::from_str("\"bottom-right\"").unwrap();
        assert_eq!(d, Direction::BottomRight);
    }

    #[test]
    fn rendering_is_deterministic() {
        for d in Direction::ALL {
            let a = render_gradient(&spec(d, 37, 53)).unwrap();
            let b = render_gradient(&spec(d, 37, 53)).unwrap();
            assert_eq!(a.as_raw(), b.as_raw(), "{d}");
        }
    }

    #[test]
    fn scanline_modes_are_constant_along_the_scanline() {
        let v = render_gradient(&spec(Direction::Vertical, 16, 32)).unwrap();
        for y in 0..32 {
            let first = px(&v, 0, y);
            assert!((0..16).all(|x| px(&v, x, y) == first));
        }
        let h = render_gradient(&spec(Direction::Horizontal, 32, 16)).unwrap();
        for x in 0..32 {
            let first = px(&h, x, 0);
            assert!((0..16).all(|y| px(&h, x, y) == first));
        }
    }

    #[test]
    fn per_pixel_modes_match_the_reference_formula() {
        let s = spec(Direction::Diagonal, 23, 41);
        let img = render_gradient(&s).unwrap();
        for y in 0..41 {
            for x in 0..23 {
                let t = (f64::from(x) / 23.0 + f64::from(y) / 41.0) / 2.0;
                assert_eq!(px(&img, x, y), interpolate(&s.stops, t).unwrap());
            }
        }
        let corner = render_gradient(&spec(Direction::BottomRight, 23, 41)).unwrap();
        assert_eq!(corner.as_raw(), img.as_raw());
    }

    #[test]
    fn vertical_endpoints_are_first_and_last_stop() {
        let s = spec(Direction::Vertical, 4, 10);
        let img = render_gradient(&s).unwrap();
        assert_eq!(px(&img, 0, 0), s.stops[0]);
        assert_eq!(px(&img, 0, 9), s.stops[2]);
        assert!(img.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn degenerate_canvas_is_a_config_error() {
        let err = render_gradient(&spec(Direction::Vertical, 10, 1)).unwrap_err();
        assert!(matches!(err, PosterError::Config(_)));
    }
}
