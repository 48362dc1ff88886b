use smallvec::SmallVec;

use crate::foundation::core::Rgb;
use crate::foundation::error::{PosterError, PosterResult};

/// Ordered gradient stops. Catalog palettes rarely exceed a handful of colors.
pub type Stops = SmallVec<[Rgb; 8]>;

/// Parse `#RRGGBB` / `RRGGBB` (case-insensitive).
pub fn parse_hex_color(s: &str) -> PosterResult<Rgb> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PosterError::config(format!(
            "invalid color format \"{s}\": expected 6 hex digits like #FFFFFF"
        )));
    }

    let byte = |i: usize| -> PosterResult<u8> {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| PosterError::config(format!("invalid color value \"{s}\"")))
    };
    Ok(Rgb::new(byte(0)?, byte(2)?, byte(4)?))
}

/// Parse every palette entry, rejecting empty palettes.
pub fn parse_palette<S: AsRef<str>>(colors: &[S]) -> PosterResult<Stops> {
    if colors.is_empty() {
        return Err(PosterError::config("palette has no colors"));
    }
    colors.iter().map(|c| parse_hex_color(c.as_ref())).collect()
}

/// Multi-stop linear interpolation at `t` in `[0, 1]`.
///
/// Channels are truncated, not rounded, so pixel output matches the reference renderer.
pub fn interpolate(stops: &[Rgb], t: f64) -> PosterResult<Rgb> {
    Ok(Interpolator::new(stops)?.at(t))
}

/// Precomputed stop table for hot loops; `at` is `interpolate` without validation.
#[derive(Clone, Debug)]
pub struct Interpolator {
    stops: SmallVec<[[f64; 3]; 8]>,
    last: Rgb,
}

impl Interpolator {
    pub fn new(stops: &[Rgb]) -> PosterResult<Self> {
        let last = *stops
            .last()
            .ok_or_else(|| PosterError::config("cannot interpolate an empty palette"))?;
        Ok(Self {
            stops: stops
                .iter()
                .map(|c| [f64::from(c.r), f64::from(c.g), f64::from(c.b)])
                .collect(),
            last,
        })
    }

    #[inline]
    pub fn at(&self, t: f64) -> Rgb {
        let n = self.stops.len();
        match n {
            1 => self.last,
            2 => mix(&self.stops[0], &self.stops[1], t),
            _ => {
                let segment = t * (n - 1) as f64;
                let index = segment as usize;
                if index >= n - 1 {
                    return self.last;
                }
                let local = segment - index as f64;
                mix(&self.stops[index], &self.stops[index + 1], local)
            }
        }
    }
}

#[inline]
fn mix(a: &[f64; 3], b: &[f64; 3], t: f64) -> Rgb {
    // `as u8` truncates toward zero and saturates.
    let ch = |i: usize| (a[i] * (1.0 - t) + b[i] * t) as u8;
    Rgb::new(ch(0), ch(1), ch(2))
}
