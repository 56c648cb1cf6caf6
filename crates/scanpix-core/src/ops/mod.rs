//! Pixel operations and the partitioned runners they are built on.

pub mod color;
pub mod copy;
pub mod fill;
pub mod filter;
pub mod partition;
pub mod tone;

pub use color::{hue_shift, saturation};
pub use copy::{CopyOptions, copy_pixels};
pub use fill::{fill, unmultiply_alpha};
pub use filter::{bilateral, sharpen};
pub use partition::{LockMode, Partitioner, map_rows, map_rows_into, scan_rows};
pub use tone::{brightness, contrast};

use crate::buffer::{PixelBufferMut, PixelLayout};
use crate::error::{Result, ScanpixError};

/// Distinct byte offsets of the color channels of one pixel: one entry for
/// gray, three for RGB(A). Alpha is never included.
pub(crate) fn color_channels(layout: &PixelLayout) -> Vec<usize> {
    let o = layout.offsets();
    if layout.is_gray() {
        vec![0]
    } else {
        vec![o.red, o.green, o.blue]
    }
}

pub(crate) fn check_same_size(left: &PixelLayout, right: &PixelLayout) -> Result<()> {
    if left.width() == right.width() && left.height() == right.height() {
        Ok(())
    } else {
        Err(ScanpixError::DimensionMismatch {
            left_width: left.width(),
            left_height: left.height(),
            right_width: right.width(),
            right_height: right.height(),
        })
    }
}

/// Run `lut` over every color channel of every pixel, leaving alpha alone.
pub(crate) fn apply_lut(
    parts: &Partitioner,
    buf: &mut PixelBufferMut<'_>,
    lut: &[u8; 256],
    operation: &'static str,
) -> Result<()> {
    let layout = *buf.layout();
    if layout.is_bit_packed() {
        return Err(ScanpixError::unsupported(operation, layout.encoding()));
    }
    let channels = color_channels(&layout);
    let bpp = layout.bytes_per_pixel();
    map_rows(parts, buf, |band| {
        for y in band.rows() {
            for px in band.row_mut(y).chunks_exact_mut(bpp) {
                for &c in &channels {
                    px[c] = lut[px[c] as usize];
                }
            }
        }
        Ok(())
    })
}
