use image::RgbaImage;

use crate::foundation::core::{Canvas, PixelRect};
use crate::layout::panel::RoundedBounds;

/// Fill a rounded rectangle as four corner circles plus two overlapping rectangles.
///
/// Pixels are tested at their centers and overwritten with `px` (no blending). The union covers
/// exactly the pixel centers inside the nominal rounded rectangle, see [`nominal_contains`].
pub fn fill_rounded_rect(img: &mut RgbaImage, bounds: RoundedBounds, px: [u8; 4]) {
    let RoundedBounds { rect, radius } = bounds;
    let r = radius.min(rect.width / 2).min(rect.height / 2) as i32;
    let (left, top) = (rect.x + r, rect.y + r);
    let (right, bottom) = (rect.right() - r, rect.bottom() - r);

    for (cx, cy) in [(left, top), (right, top), (left, bottom), (right, bottom)] {
        fill_circle(img, cx, cy, r, px);
    }
    fill_rect(
        img,
        PixelRect {
            x: left,
            y: rect.y,
            width: (right - left) as u32,
            height: rect.height,
        },
        px,
    );
    fill_rect(
        img,
        PixelRect {
            x: rect.x,
            y: top,
            width: rect.width,
            height: (bottom - top) as u32,
        },
        px,
    );
}

/// Reference predicate: pixel center within `radius` of the rectangle shrunk by `radius`.
pub fn nominal_contains(bounds: RoundedBounds, x: i32, y: i32) -> bool {
    let RoundedBounds { rect, radius } = bounds;
    let r = i64::from(radius.min(rect.width / 2).min(rect.height / 2));
    // Doubled coordinates keep pixel centers integral.
    let (px, py) = (2 * i64::from(x) + 1, 2 * i64::from(y) + 1);
    let (x0, y0) = (2 * i64::from(rect.x), 2 * i64::from(rect.y));
    let (x1, y1) = (2 * i64::from(rect.right()), 2 * i64::from(rect.bottom()));
    if px < x0 || px > x1 || py < y0 || py > y1 {
        return false;
    }
    let nx = px.clamp(x0 + 2 * r, x1 - 2 * r);
    let ny = py.clamp(y0 + 2 * r, y1 - 2 * r);
    let (dx, dy) = (px - nx, py - ny);
    dx * dx + dy * dy <= 4 * r * r
}

fn fill_circle(img: &mut RgbaImage, cx: i32, cy: i32, r: i32, px: [u8; 4]) {
    let canvas = canvas_of(img);
    let bbox = PixelRect {
        x: cx - r,
        y: cy - r,
        width: 2 * r as u32,
        height: 2 * r as u32,
    };
    let Some((x0, y0, x1, y1)) = bbox.clip_to(canvas) else {
        return;
    };
    let (cx2, cy2, r2) = (2 * i64::from(cx), 2 * i64::from(cy), 4 * i64::from(r) * i64::from(r));
    for y in y0..y1 {
        let dy = 2 * i64::from(y) + 1 - cy2;
        for x in x0..x1 {
            let dx = 2 * i64::from(x) + 1 - cx2;
            if dx * dx + dy * dy <= r2 {
                img.put_pixel(x, y, image::Rgba(px));
            }
        }
    }
}

fn fill_rect(img: &mut RgbaImage, rect: PixelRect, px: [u8; 4]) {
    let canvas = canvas_of(img);
    let Some((x0, y0, x1, y1)) = rect.clip_to(canvas) else {
        return;
    };
    let stride = canvas.width as usize * 4;
    let buf: &mut [u8] = img;
    for y in y0 as usize..y1 as usize {
        let row = &mut buf[y * stride + x0 as usize * 4..y * stride + x1 as usize * 4];
        for dst in row.chunks_exact_mut(4) {
            dst.copy_from_slice(&px);
        }
    }
}

pub(crate) fn canvas_of(img: &RgbaImage) -> Canvas {
    Canvas {
        width: img.width(),
        height: img.height(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INK: [u8; 4] = [1, 2, 3, 255];

    fn bounds(x: i32, y: i32, width: u32, height: u32, radius: u32) -> RoundedBounds {
        RoundedBounds {
            rect: PixelRect {
                x,
                y,
                width,
                height,
            },
            radius,
        }
    }

    fn assert_matches_nominal(img_w: u32, img_h: u32, b: RoundedBounds) {
        let mut img = RgbaImage::new(img_w, img_h);
        fill_rounded_rect(&mut img, b, INK);
        for y in 0..img_h {
            for x in 0..img_w {
                let painted = img.get_pixel(x, y).0 == INK;
                let expected = nominal_contains(b, x as i32, y as i32);
                assert_eq!(painted, expected, "pixel ({x},{y}) for {b:?}");
            }
        }
    }

    #[test]
    fn union_has_no_seams_and_no_overspill() {
        assert_matches_nominal(120, 90, bounds(10, 5, 100, 80, 20));
        assert_matches_nominal(64, 64, bounds(3, 7, 41, 33, 9));
        assert_matches_nominal(50, 50, bounds(0, 0, 50, 50, 25));
        assert_matches_nominal(30, 30, bounds(5, 5, 20, 10, 0));
    }

    #[test]
    fn clips_rectangles_crossing_the_canvas_edge() {
        assert_matches_nominal(40, 40, bounds(-10, -6, 60, 30, 12));
        assert_matches_nominal(40, 40, bounds(25, 30, 40, 40, 8));
    }

    #[test]
    fn corners_are_rounded_and_edges_are_filled() {
        let b = bounds(0, 0, 100, 60, 20);
        let mut img = RgbaImage::new(100, 60);
        fill_rounded_rect(&mut img, b, INK);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(99, 59).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(50, 0).0, INK);
        assert_eq!(img.get_pixel(0, 30).0, INK);
        assert_eq!(img.get_pixel(50, 30).0, INK);
    }
}
