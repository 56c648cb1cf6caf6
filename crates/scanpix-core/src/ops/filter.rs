//! Neighborhood filters: sharpen and bilateral smoothing.
//!
//! Both read a window of source rows around each output pixel, so they are
//! binary operations writing into a separate destination of the same size.
//! Pixels closer to an edge than the window radius are copied unchanged.

use std::sync::LazyLock;

use tracing::debug;

use super::{Partitioner, check_same_size, map_rows_into};
use crate::buffer::{PixelBuffer, PixelBufferMut, PixelLayout, luma};
use crate::error::{Result, ScanpixError, check_range};

const SHARPEN_RADIUS: usize = 2;
const BILATERAL_RADIUS: usize = 4;
const BILATERAL_SIZE: usize = 2 * BILATERAL_RADIUS + 1;
/// Distance at which the spatial weight reaches zero.
const BILATERAL_FALLOFF: f32 = 5.0;
const COLOR_BUCKETS: usize = 32;

/// 5×5 sharpen kernel: 16 at the center, 2 on the inner ring, −1 on the
/// outer ring. The weights sum to 16.
static SHARPEN_KERNEL: LazyLock<[[i32; 5]; 5]> = LazyLock::new(|| {
    let mut kernel = [[-1; 5]; 5];
    for (dy, row) in kernel.iter_mut().enumerate() {
        for (dx, w) in row.iter_mut().enumerate() {
            if dy.abs_diff(2) <= 1 && dx.abs_diff(2) <= 1 {
                *w = 2;
            }
        }
    }
    kernel[2][2] = 16;
    kernel
});

/// Spatial weight of each offset in the 9×9 window: `max(0, 1 − d / 5)`.
static SPATIAL_WEIGHTS: LazyLock<[[f32; BILATERAL_SIZE]; BILATERAL_SIZE]> =
    LazyLock::new(|| {
        let mut table = [[0.0; BILATERAL_SIZE]; BILATERAL_SIZE];
        for (dy, row) in table.iter_mut().enumerate() {
            for (dx, w) in row.iter_mut().enumerate() {
                let fy = dy as f32 - BILATERAL_RADIUS as f32;
                let fx = dx as f32 - BILATERAL_RADIUS as f32;
                let d = (fx * fx + fy * fy).sqrt();
                *w = (1.0 - d / BILATERAL_FALLOFF).max(0.0);
            }
        }
        table
    });

/// Color-similarity weight by luma-difference bucket, falling linearly to 0.
static COLOR_WEIGHTS: LazyLock<[f32; COLOR_BUCKETS]> = LazyLock::new(|| {
    let last = (COLOR_BUCKETS - 1) as f32;
    std::array::from_fn(|i| (last - i as f32) / last)
});

/// Sharpen `src` into `dst`.
///
/// ```text
/// out = clamp(amount / 16 × Σ kernel·in + (1 − amount) × in, 0, 255)
/// ```
///
/// `amount` is in [-1, 1]; 0 copies the source. Gray and color buffers of
/// equal size are supported, alpha is copied through.
pub fn sharpen(
    parts: &Partitioner,
    src: &PixelBuffer<'_>,
    dst: &mut PixelBufferMut<'_>,
    amount: f32,
) -> Result<()> {
    check_range("sharpen", amount as f64, -1.0, 1.0, "[-1, 1]")?;
    check_filter_buffers("sharpen", src.layout(), dst.layout())?;
    let factor = amount / 16.0;
    let bias = 1.0 - amount;
    debug!(amount, width = src.width(), height = src.height(), "sharpen");

    let kernel = &*SHARPEN_KERNEL;
    map_rows_into(parts, src, dst, 0..src.height(), |src, band| {
        let s = *src.layout();
        let d = *band.layout();
        let (w, h) = (s.width(), s.height());
        for py in band.rows() {
            let y = d.physical_row(py);
            let row = band.row_mut(py);
            let interior_row = y >= SHARPEN_RADIUS && y + SHARPEN_RADIUS < h;
            for x in 0..w {
                let center = s.rgb_at(src.logical_row(y), x);
                let interior = interior_row && x >= SHARPEN_RADIUS && x + SHARPEN_RADIUS < w;
                let out = if interior {
                    let mut sum = [0i32; 3];
                    for (ky, krow) in kernel.iter().enumerate() {
                        let line = src.logical_row(y + ky - SHARPEN_RADIUS);
                        for (kx, &k) in krow.iter().enumerate() {
                            let px = s.rgb_at(line, x + kx - SHARPEN_RADIUS);
                            for c in 0..3 {
                                sum[c] += k * px[c] as i32;
                            }
                        }
                    }
                    std::array::from_fn(|c| {
                        let v = factor * sum[c] as f32 + bias * center[c] as f32;
                        v.round().clamp(0.0, 255.0) as u8
                    })
                } else {
                    center
                };
                d.put_rgb(row, x, out);
                d.put_alpha(row, x, s.alpha_at(src.logical_row(y), x));
            }
        }
        Ok(())
    })
}

/// Edge-preserving smoothing of `src` into `dst` over a 9×9 window.
///
/// Each neighbor is weighted by its spatial falloff times the similarity of
/// its luma to the center pixel's, so flat paper texture is smoothed while
/// text edges are kept.
pub fn bilateral(parts: &Partitioner, src: &PixelBuffer<'_>, dst: &mut PixelBufferMut<'_>) -> Result<()> {
    check_filter_buffers("bilateral filter", src.layout(), dst.layout())?;
    debug!(width = src.width(), height = src.height(), "bilateral filter");

    let spatial = &*SPATIAL_WEIGHTS;
    let color = &*COLOR_WEIGHTS;
    map_rows_into(parts, src, dst, 0..src.height(), |src, band| {
        let s = *src.layout();
        let d = *band.layout();
        let (w, h) = (s.width(), s.height());
        for py in band.rows() {
            let y = d.physical_row(py);
            let row = band.row_mut(py);
            let interior_row = y >= BILATERAL_RADIUS && y + BILATERAL_RADIUS < h;
            for x in 0..w {
                let center = s.rgb_at(src.logical_row(y), x);
                let interior = interior_row && x >= BILATERAL_RADIUS && x + BILATERAL_RADIUS < w;
                let out = if interior {
                    let center_luma = luma(center) as i32;
                    let mut sum = [0.0f32; 3];
                    let mut total = 0.0f32;
                    for (ky, weights) in spatial.iter().enumerate() {
                        let line = src.logical_row(y + ky - BILATERAL_RADIUS);
                        for (kx, &ws) in weights.iter().enumerate() {
                            if ws == 0.0 {
                                continue;
                            }
                            let px = s.rgb_at(line, x + kx - BILATERAL_RADIUS);
                            let diff = (luma(px) as i32 - center_luma).unsigned_abs() as usize / 2;
                            let weight = ws * color[diff.min(COLOR_BUCKETS - 1)];
                            for c in 0..3 {
                                sum[c] += weight * px[c] as f32;
                            }
                            total += weight;
                        }
                    }
                    std::array::from_fn(|c| (sum[c] / total).round().clamp(0.0, 255.0) as u8)
                } else {
                    center
                };
                d.put_rgb(row, x, out);
                d.put_alpha(row, x, s.alpha_at(src.logical_row(y), x));
            }
        }
        Ok(())
    })
}

fn check_filter_buffers(operation: &'static str, src: &PixelLayout, dst: &PixelLayout) -> Result<()> {
    for layout in [src, dst] {
        if layout.is_bit_packed() {
            return Err(ScanpixError::unsupported(operation, layout.encoding()));
        }
    }
    check_same_size(src, dst)
}
