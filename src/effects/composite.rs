use image::{RgbImage, RgbaImage};

use crate::foundation::error::{PosterError, PosterResult};

pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(sa);
    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        out[i] = add_sat_u8(src[i], mul_div255(u16::from(dst[i]), inv));
    }
    out
}

pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> PosterResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(PosterError::Other(anyhow::anyhow!(
            "over_in_place expects equal-length rgba8 buffers"
        )));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Composite a premultiplied layer onto `dst` with its top-left at `(x, y)`.
///
/// The layer's own alpha acts as the paste mask; parts outside `dst` are dropped.
pub fn over_at(dst: &mut RgbaImage, layer: &RgbaImage, x: i32, y: i32) {
    let (dw, dh) = (dst.width() as i32, dst.height() as i32);
    let (lw, lh) = (layer.width() as i32, layer.height() as i32);
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + lw).min(dw);
    let y1 = (y + lh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let d_stride = dw as usize * 4;
    let l_stride = lw as usize * 4;
    let span = (x1 - x0) as usize * 4;
    let dst_buf: &mut [u8] = dst;
    for dy in y0..y1 {
        let ly = (dy - y) as usize;
        let d_off = dy as usize * d_stride + x0 as usize * 4;
        let l_off = ly * l_stride + (x0 - x) as usize * 4;
        let d_row = &mut dst_buf[d_off..d_off + span];
        let l_row = &layer.as_raw()[l_off..l_off + span];
        for (d, s) in d_row.chunks_exact_mut(4).zip(l_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
    }
}

/// Drop alpha from an opaque premultiplied canvas.
pub fn flatten_to_rgb(img: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (d, s) in out.pixels_mut().zip(img.pixels()) {
        d.0 = [s.0[0], s.0[1], s.0[2]];
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        assert_eq!(over(dst, [0, 0, 0, 0]), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn over_translucent_black_darkens_opaque_dst() {
        // 100/255 black over white.
        let out = over([255, 255, 255, 255], [0, 0, 0, 100]);
        assert_eq!(out, [155, 155, 155, 255]);
    }

    #[test]
    fn over_at_clips_and_offsets() {
        let mut dst = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        let layer = RgbaImage::from_pixel(3, 3, image::Rgba([9, 9, 9, 255]));
        over_at(&mut dst, &layer, 2, -1);
        assert_eq!(dst.get_pixel(2, 0).0, [9, 9, 9, 255]);
        assert_eq!(dst.get_pixel(3, 1).0, [9, 9, 9, 255]);
        assert_eq!(dst.get_pixel(3, 2).0, [0, 0, 0, 255]);
        assert_eq!(dst.get_pixel(1, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn over_in_place_rejects_length_mismatch() {
        let mut dst = vec![0u8; 8];
        assert!(over_in_place(&mut dst, &[0u8; 4]).is_err());
    }

    #[test]
    fn flatten_keeps_color_channels() {
        let img = RgbaImage::from_pixel(2, 1, image::Rgba([1, 2, 3, 255]));
        assert_eq!(flatten_to_rgb(&img).get_pixel(1, 0).0, [1, 2, 3]);
    }
}
