//! Root-mean-square difference between two images.

use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::error::{Result, ScanpixError};
use crate::ops::{Partitioner, check_same_size, scan_rows};

/// RMSE over R, G, B, plus A when either side has alpha (a missing alpha
/// channel reads as opaque). Both buffers must be RGB(A) of equal size.
pub fn rmse(parts: &Partitioner, left: &PixelBuffer<'_>, right: &PixelBuffer<'_>) -> Result<f64> {
    let (l, r) = (*left.layout(), *right.layout());
    for layout in [&l, &r] {
        if !layout.is_color() {
            return Err(ScanpixError::unsupported("rmse", layout.encoding()));
        }
    }
    check_same_size(&l, &r)?;
    let with_alpha = l.has_alpha() || r.has_alpha();
    let channels = if with_alpha { 4 } else { 3 };

    let sum = scan_rows(
        parts,
        left,
        0u64,
        |left, rows| {
            let mut sum = 0u64;
            for py in rows {
                let y = l.physical_row(py);
                let (lrow, rrow) = (left.row(py), right.logical_row(y));
                for x in 0..l.width() {
                    let a = l.rgb_at(lrow, x);
                    let b = r.rgb_at(rrow, x);
                    for c in 0..3 {
                        sum += (a[c] as i64 - b[c] as i64).pow(2) as u64;
                    }
                    if with_alpha {
                        sum += (l.alpha_at(lrow, x) as i64 - r.alpha_at(rrow, x) as i64).pow(2) as u64;
                    }
                }
            }
            Ok(sum)
        },
        |total, partial| *total += partial,
    )?;

    let samples = (l.width() * l.height() * channels) as f64;
    let value = (sum as f64 / samples).sqrt();
    debug!(value, channels, "rmse");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{PixelEncoding, PixelImage, PixelLayout};

    #[test]
    fn test_identical_buffers_have_zero_error() {
        let layout = PixelLayout::new(7, 5, PixelEncoding::Bgra);
        let data: Vec<u8> = (0..layout.required_len()).map(|i| (i * 13 % 251) as u8).collect();
        let img = PixelImage::from_raw(data, layout).unwrap();
        assert_eq!(rmse(&Partitioner::new(4, 1), &img.lock(), &img.lock()).unwrap(), 0.0);
    }

    #[test]
    fn test_constant_offset() {
        let layout = PixelLayout::new(2, 2, PixelEncoding::Rgb);
        let a = PixelImage::from_raw(vec![10; 12], layout).unwrap();
        let b = PixelImage::from_raw(vec![13; 12], layout).unwrap();
        assert_eq!(rmse(&Partitioner::single(), &a.lock(), &b.lock()).unwrap(), 3.0);
    }

    #[test]
    fn test_compares_channels_not_bytes() {
        let a = PixelImage::from_raw(vec![1, 2, 3], PixelLayout::new(1, 1, PixelEncoding::Rgb)).unwrap();
        let b = PixelImage::from_raw(vec![3, 2, 1], PixelLayout::new(1, 1, PixelEncoding::Bgr)).unwrap();
        assert_eq!(rmse(&Partitioner::single(), &a.lock(), &b.lock()).unwrap(), 0.0);
    }

    #[test]
    fn test_missing_alpha_reads_as_opaque() {
        let a = PixelImage::from_raw(vec![0, 0, 0], PixelLayout::new(1, 1, PixelEncoding::Rgb)).unwrap();
        let b =
            PixelImage::from_raw(vec![0, 0, 0, 55], PixelLayout::new(1, 1, PixelEncoding::Rgba)).unwrap();
        // Only alpha differs: sqrt(200² / 4) = 100.
        assert_eq!(rmse(&Partitioner::single(), &a.lock(), &b.lock()).unwrap(), 100.0);
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let a = PixelImage::new(2, 2, PixelEncoding::Rgb).unwrap();
        let b = PixelImage::new(2, 3, PixelEncoding::Rgb).unwrap();
        assert!(matches!(
            rmse(&Partitioner::single(), &a.lock(), &b.lock()),
            Err(ScanpixError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_gray_is_unsupported() {
        let a = PixelImage::new(2, 2, PixelEncoding::Gray8).unwrap();
        assert!(rmse(&Partitioner::single(), &a.lock(), &a.lock()).is_err());
    }
}
