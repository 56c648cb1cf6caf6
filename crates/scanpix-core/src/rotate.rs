//! Lossless quarter-turn rotation.

use tracing::debug;

use crate::buffer::{PixelBuffer, PixelBufferMut, PixelLayout};
use crate::error::{Result, ScanpixError};
use crate::ops::{Partitioner, map_rows_into};

/// Rotate `src` clockwise by `turns` quarter turns into `dst`.
///
/// `turns` is taken modulo 4 (negative values turn counter-clockwise).
/// Both buffers must share the same pixel layout, and `dst` must have the
/// rotated dimensions. Pixels are moved bit for bit, so four turns
/// reproduce the source exactly.
pub fn rotate_quarter(
    parts: &Partitioner,
    src: &PixelBuffer<'_>,
    dst: &mut PixelBufferMut<'_>,
    turns: i32,
) -> Result<()> {
    let turns = turns.rem_euclid(4) as usize;
    let (s, d) = (*src.layout(), *dst.layout());
    if !s.same_bit_layout(&d) {
        return Err(ScanpixError::InvalidLayout(format!(
            "rotation needs matching encodings, got {} and {}",
            s.encoding(),
            d.encoding()
        )));
    }
    let (w, h) = (s.width(), s.height());
    let (out_w, out_h) = if turns % 2 == 1 { (h, w) } else { (w, h) };
    if d.width() != out_w || d.height() != out_h {
        return Err(ScanpixError::DimensionMismatch {
            left_width: out_w,
            left_height: out_h,
            right_width: d.width(),
            right_height: d.height(),
        });
    }
    debug!(turns, width = w, height = h, "rotate");

    // Source coordinates of destination pixel (x, y).
    let source_of = move |x: usize, y: usize| -> (usize, usize) {
        match turns {
            0 => (x, y),
            1 => (y, h - 1 - x),
            2 => (w - 1 - x, h - 1 - y),
            _ => (w - 1 - y, x),
        }
    };

    map_rows_into(parts, src, dst, 0..out_h, |src, band| {
        for py in band.rows() {
            let y = d.physical_row(py);
            let row = band.row_mut(py);
            for x in 0..out_w {
                let (sx, sy) = source_of(x, y);
                move_pixel(&s, src.logical_row(sy), sx, &d, row, x);
            }
        }
        Ok(())
    })
}

#[inline]
fn move_pixel(s: &PixelLayout, from: &[u8], sx: usize, d: &PixelLayout, to: &mut [u8], dx: usize) {
    let bpp = s.bytes_per_pixel();
    if bpp == 0 {
        d.put_bit(to, dx, s.bit_is_white(from, sx));
    } else {
        to[dx * bpp..(dx + 1) * bpp].copy_from_slice(&from[sx * bpp..(sx + 1) * bpp]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{PixelEncoding, PixelImage};
    use crate::ops::LockMode;

    fn rotated(src: &PixelImage, turns: i32) -> PixelImage {
        let (w, h) = if turns.rem_euclid(2) == 1 {
            (src.height(), src.width())
        } else {
            (src.width(), src.height())
        };
        let mut dst = PixelImage::new(w, h, src.encoding()).unwrap();
        rotate_quarter(
            &Partitioner::new(3, 1),
            &src.lock(),
            &mut dst.lock_mut(LockMode::WriteOnly),
            turns,
        )
        .unwrap();
        dst
    }

    #[test]
    fn test_single_turn_is_clockwise() {
        // 2×3 gray:   1 2       5 3 1
        //             3 4   →   6 4 2
        //             5 6
        let layout = PixelLayout::new(2, 3, PixelEncoding::Gray8);
        let src = PixelImage::from_raw(vec![1, 2, 3, 4, 5, 6], layout).unwrap();
        let dst = rotated(&src, 1);
        assert_eq!((dst.width(), dst.height()), (3, 2));
        assert_eq!(dst.as_bytes(), &[5, 3, 1, 6, 4, 2]);
        assert_eq!(rotated(&src, -1).as_bytes(), &[2, 4, 6, 1, 3, 5]);
    }

    #[test]
    fn test_four_turns_restore_every_encoding() {
        for encoding in [PixelEncoding::Rgb, PixelEncoding::Bgra, PixelEncoding::Gray8, PixelEncoding::Bit] {
            let layout = PixelLayout::new(11, 7, encoding);
            let mut src = PixelImage::with_layout(layout).unwrap();
            {
                let mut buf = src.lock_mut(LockMode::WriteOnly);
                for y in 0..7 {
                    let row = buf.row_mut(y);
                    for x in 0..11 {
                        let v = ((x * 31 + y * 17) % 256) as u8;
                        layout.put_rgb(row, x, [v, v / 2, 255 - v]);
                        layout.put_alpha(row, x, v);
                    }
                }
            }
            let mut img = src.clone();
            for _ in 0..4 {
                img = rotated(&img, 1);
            }
            assert_eq!(img.as_bytes(), src.as_bytes(), "{encoding}");
            assert_eq!(rotated(&src, 4).as_bytes(), src.as_bytes());
        }
    }

    #[test]
    fn test_half_turn_on_bits() {
        let layout = PixelLayout::new(3, 1, PixelEncoding::Bit);
        let src = PixelImage::from_raw(vec![0b1100_0000], layout).unwrap();
        assert_eq!(rotated(&src, 2).as_bytes(), &[0b0110_0000]);
    }

    #[test]
    fn test_wrong_destination_size_is_rejected() {
        let src = PixelImage::new(4, 2, PixelEncoding::Rgb).unwrap();
        let mut dst = PixelImage::new(4, 2, PixelEncoding::Rgb).unwrap();
        let err = rotate_quarter(&Partitioner::single(), &src.lock(), &mut dst.lock_mut(LockMode::WriteOnly), 1)
            .unwrap_err();
        assert!(matches!(err, ScanpixError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_mixed_encodings_are_rejected() {
        let src = PixelImage::new(4, 4, PixelEncoding::Rgb).unwrap();
        let mut dst = PixelImage::new(4, 4, PixelEncoding::Bgr).unwrap();
        assert!(
            rotate_quarter(&Partitioner::single(), &src.lock(), &mut dst.lock_mut(LockMode::WriteOnly), 2)
                .is_err()
        );
    }
}
