//! Flat fill and alpha unmultiply.

use tracing::debug;

use super::{Partitioner, map_rows};
use crate::buffer::{PixelBufferMut, luma};
use crate::error::{Result, ScanpixError};

/// Set every pixel to `color` (R, G, B, A).
///
/// Gray buffers receive the color's luma, 1-bit buffers its luma
/// thresholded at 128 (honoring the inversion flag), and buffers without
/// alpha ignore the fourth component.
pub fn fill(parts: &Partitioner, buf: &mut PixelBufferMut<'_>, color: [u8; 4]) -> Result<()> {
    let layout = *buf.layout();
    let [r, g, b, a] = color;
    debug!(?color, encoding = %layout.encoding(), "fill");

    // One encoded pixel, replicated across each row.
    let pixel: Vec<u8> = match layout.bytes_per_pixel() {
        0 => {
            let white = luma([r, g, b]) >= 128;
            let byte = if white != layout.bit_inverted() { 0xFF } else { 0x00 };
            vec![byte]
        }
        bpp => {
            let mut px = vec![0u8; bpp];
            layout.put_rgb(&mut px, 0, [r, g, b]);
            layout.put_alpha(&mut px, 0, a);
            px
        }
    };

    map_rows(parts, buf, |band| {
        for y in band.rows() {
            let row = band.row_mut(y);
            match *pixel.as_slice() {
                [p0, p1, p2, p3] => bytemuck::cast_slice_mut::<u8, [u8; 4]>(row).fill([p0, p1, p2, p3]),
                [p0, p1, p2] => bytemuck::cast_slice_mut::<u8, [u8; 3]>(row).fill([p0, p1, p2]),
                _ => row.fill(pixel[0]),
            }
        }
        Ok(())
    })
}

/// Convert premultiplied color back to straight alpha.
///
/// Each color channel of a translucent pixel becomes `min(255, v × 255 / a)`.
/// Opaque pixels are untouched, as are fully transparent ones, whose color
/// cannot be recovered.
pub fn unmultiply_alpha(parts: &Partitioner, buf: &mut PixelBufferMut<'_>) -> Result<()> {
    let layout = *buf.layout();
    let Some(alpha) = layout.offsets().alpha else {
        return Err(ScanpixError::unsupported("unmultiply alpha", layout.encoding()));
    };
    let o = layout.offsets();
    let channels = [o.red, o.green, o.blue];
    debug!(encoding = %layout.encoding(), "unmultiply alpha");

    map_rows(parts, buf, |band| {
        for y in band.rows() {
            for px in bytemuck::cast_slice_mut::<u8, [u8; 4]>(band.row_mut(y)) {
                let a = px[alpha] as u32;
                if a == 255 || a == 0 {
                    continue;
                }
                for &c in &channels {
                    px[c] = (px[c] as u32 * 255 / a).min(255) as u8;
                }
            }
        }
        Ok(())
    })
}
