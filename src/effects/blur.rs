use rayon::prelude::*;

use crate::foundation::error::{PosterError, PosterResult};

/// Separable Gaussian blur over premultiplied RGBA8 with clamp-to-edge sampling.
///
/// Weights are Q16 fixed point and sum to exactly 1.0, so constant regions stay constant.
pub fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> PosterResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| PosterError::config("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(PosterError::Other(anyhow::anyhow!(
            "blur_rgba8_premul expects src matching width*height*4"
        )));
    }
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass(src, &mut tmp, width, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

/// `2 * radius + 1` taps; rounding error is folded into the center tap so the sum is exactly 1.0.
fn gaussian_kernel_q16(radius: u32, sigma: f32) -> PosterResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(PosterError::config("blur sigma must be > 0"));
    }

    let two_sigma_sq = 2.0 * f64::from(sigma) * f64::from(sigma);
    let half: Vec<f64> = (0..=radius)
        .map(|d| (-f64::from(d * d) / two_sigma_sq).exp())
        .collect();
    let total = half[0] + 2.0 * half[1..].iter().sum::<f64>();

    let side: Vec<u32> = half[1..]
        .iter()
        .map(|w| ((w / total) * 65536.0).round() as u32)
        .collect();
    let center = 65536u32.saturating_sub(2 * side.iter().sum::<u32>());

    let mut kernel = Vec::with_capacity(2 * radius as usize + 1);
    kernel.extend(side.iter().rev());
    kernel.push(center);
    kernel.extend(side.iter());
    Ok(kernel)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let stride = width as usize * 4;
    dst.par_chunks_exact_mut(stride)
        .zip(src.par_chunks_exact(stride))
        .for_each(|(dst_row, src_row)| {
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                    let idx = sx as usize * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src_row[idx + c]);
                    }
                }
                let out_idx = x as usize * 4;
                for c in 0..4 {
                    dst_row[out_idx + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let h = height as i32;
    let stride = width as usize * 4;
    dst.par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let y = y as i32;
            for x in 0..stride / 4 {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                    let idx = sy as usize * stride + x * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                    }
                }
                for c in 0..4 {
                    dst_row[x * 4 + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    (v.min(255)) as u8
}
