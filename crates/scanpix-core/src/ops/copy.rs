//! Pixel copy and format conversion between two buffers.
//!
//! The source window (`source_x`, `source_y`, `columns`, `rows`) is written
//! to the destination at (`dest_x`, `dest_y`), converting between encodings
//! on the way. Identical layouts are copied row by row as raw bytes.
//! With `dest_channel` set only that channel of a color destination is
//! written, so separate gray frames can be assembled into one RGB image.

use tracing::debug;

use super::partition::{Partitioner, map_rows_into};
use crate::buffer::{Channel, PixelBuffer, PixelBufferMut, PixelLayout, RowBand, luma_1000};
use crate::error::{Result, ScanpixError, check_range};

/// Placement and thresholds for [`copy_pixels`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CopyOptions {
    pub source_x: usize,
    pub source_y: usize,
    /// Columns to copy; defaults to the rest of the source row.
    pub columns: Option<usize>,
    /// Rows to copy; defaults to the rest of the source.
    pub rows: Option<usize>,
    pub dest_x: usize,
    pub dest_y: usize,
    /// Luma cut-off when writing 1-bit pixels, in [-1, 1]; 0 is mid-gray.
    /// `None` means mid-gray here and the configured default in
    /// [`crate::Engine::copy`].
    pub black_white_threshold: Option<f32>,
    /// Write only this channel of a color destination. Gray and 1-bit
    /// sources supply their value, color sources the matching channel.
    pub dest_channel: Option<Channel>,
}

impl CopyOptions {
    /// Place the whole source at `(x, y)` in the destination.
    pub fn at(x: usize, y: usize) -> Self {
        Self {
            dest_x: x,
            dest_y: y,
            ..Self::default()
        }
    }

    /// Copy only the `columns × rows` window at `(x, y)` of the source.
    pub fn window(x: usize, y: usize, columns: usize, rows: usize) -> Self {
        Self {
            source_x: x,
            source_y: y,
            columns: Some(columns),
            rows: Some(rows),
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.black_white_threshold = Some(threshold);
        self
    }

    pub fn with_dest_channel(mut self, channel: Channel) -> Self {
        self.dest_channel = Some(channel);
        self
    }
}

/// Conversion strategy chosen from the two layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopyPath {
    /// Same bit layout, byte-aligned: raw row copy.
    Raw,
    /// Byte or bit source into a byte-per-pixel destination.
    ToBytes,
    /// Byte-per-pixel source thresholded into bits.
    ToBits,
    /// Bits into bits with a different sense or misaligned columns.
    BitToBit,
    /// One destination byte per pixel; `src` is `None` for gray, 1-bit or
    /// a missing source alpha.
    Channel { src: Option<usize>, dst: usize },
}

#[derive(Debug, Clone, Copy)]
struct Plan {
    path: CopyPath,
    sx: usize,
    sy: usize,
    dx: usize,
    dy: usize,
    columns: usize,
    rows: usize,
    threshold_1000: u32,
}

/// Copy `src` into `dst` as described by `opts`.
///
/// Rules when encodings differ:
/// - RGB(A) → RGB(A): channels remapped; alpha copied only when both sides
///   have it, otherwise destination alpha is left alone.
/// - RGB(A) → Gray8: `(R×299 + G×587 + B×114) / 1000`.
/// - Gray8 or 1-bit → RGB(A): value replicated, destination alpha set opaque.
/// - any → 1-bit: luma thresholded at `opts.black_white_threshold`.
/// - `opts.dest_channel`: one channel of an RGB(A) destination, the others
///   left alone.
pub fn copy_pixels(
    parts: &Partitioner,
    src: &PixelBuffer<'_>,
    dst: &mut PixelBufferMut<'_>,
    opts: &CopyOptions,
) -> Result<()> {
    let plan = plan(src.layout(), dst.layout(), opts)?;
    debug!(
        path = ?plan.path,
        columns = plan.columns,
        rows = plan.rows,
        from = %src.layout().encoding(),
        to = %dst.layout().encoding(),
        "copy"
    );
    let dst_layout = *dst.layout();
    let first = dst_layout.physical_row(plan.dy);
    let last = dst_layout.physical_row(plan.dy + plan.rows - 1);
    let band_rows = first.min(last)..first.max(last) + 1;
    map_rows_into(parts, src, dst, band_rows, |src, band| {
        copy_band(src, band, &plan);
        Ok(())
    })
}

fn plan(src: &PixelLayout, dst: &PixelLayout, opts: &CopyOptions) -> Result<Plan> {
    let black_white_threshold = opts.black_white_threshold.unwrap_or(0.0);
    check_range(
        "black_white_threshold",
        black_white_threshold as f64,
        -1.0,
        1.0,
        "[-1, 1]",
    )?;
    if src.invert_y() {
        return Err(ScanpixError::InvalidLayout(
            "copy source must be stored top-down".to_string(),
        ));
    }
    let columns = match opts.columns {
        Some(c) => c,
        None => src.width().saturating_sub(opts.source_x),
    };
    let rows = match opts.rows {
        Some(r) => r,
        None => src.height().saturating_sub(opts.source_y),
    };
    if columns == 0 || rows == 0 {
        return Err(ScanpixError::InvalidOffset(
            "copy window is empty".to_string(),
        ));
    }
    if opts.source_x + columns > src.width() || opts.source_y + rows > src.height() {
        return Err(ScanpixError::InvalidOffset(format!(
            "source window {columns}x{rows} at ({}, {}) exceeds {}x{} source",
            opts.source_x,
            opts.source_y,
            src.width(),
            src.height()
        )));
    }
    if opts.dest_x + columns > dst.width() || opts.dest_y + rows > dst.height() {
        return Err(ScanpixError::InvalidOffset(format!(
            "{columns}x{rows} window at ({}, {}) exceeds {}x{} destination",
            opts.dest_x,
            opts.dest_y,
            dst.width(),
            dst.height()
        )));
    }

    let path = if let Some(channel) = opts.dest_channel {
        channel_path(src, dst, channel)?
    } else if src.is_bit_packed() && dst.is_bit_packed() {
        let aligned = opts.source_x % 8 == 0
            && opts.dest_x % 8 == 0
            && (columns % 8 == 0 || opts.dest_x + columns == dst.width());
        if aligned && src.same_bit_layout(dst) {
            CopyPath::Raw
        } else {
            CopyPath::BitToBit
        }
    } else if src.same_bit_layout(dst) {
        CopyPath::Raw
    } else if dst.is_bit_packed() {
        CopyPath::ToBits
    } else {
        CopyPath::ToBytes
    };

    let threshold = (black_white_threshold * 1000.0) as i32;
    let threshold_1000 = ((threshold + 1000) * 255 / 2) as u32;

    Ok(Plan {
        path,
        sx: opts.source_x,
        sy: opts.source_y,
        dx: opts.dest_x,
        dy: opts.dest_y,
        columns,
        rows,
        threshold_1000,
    })
}

fn channel_path(src: &PixelLayout, dst: &PixelLayout, channel: Channel) -> Result<CopyPath> {
    if !dst.is_color() {
        return Err(ScanpixError::unsupported("channel copy", dst.encoding()));
    }
    let Some(dst_offset) = dst.offsets().of(channel) else {
        return Err(ScanpixError::InvalidLayout(format!(
            "{} destination has no {channel:?} channel",
            dst.encoding()
        )));
    };
    let src_offset = if src.is_color() {
        src.offsets().of(channel)
    } else {
        None
    };
    Ok(CopyPath::Channel {
        src: src_offset,
        dst: dst_offset,
    })
}

fn copy_band(src: &PixelBuffer<'_>, band: &mut RowBand<'_>, plan: &Plan) {
    let s = *src.layout();
    let d = *band.layout();
    for py in band.rows() {
        let i = d.physical_row(py) - plan.dy;
        let src_row = src.row(plan.sy + i);
        let dst_row = band.row_mut(py);
        match plan.path {
            CopyPath::Raw => raw_row(&s, src_row, dst_row, plan),
            CopyPath::ToBytes => to_bytes_row(&s, &d, src_row, dst_row, plan),
            CopyPath::ToBits => to_bits_row(&s, &d, src_row, dst_row, plan),
            CopyPath::BitToBit => {
                for j in 0..plan.columns {
                    d.put_bit(dst_row, plan.dx + j, s.bit_is_white(src_row, plan.sx + j));
                }
            }
            CopyPath::Channel { src: from, dst: to } => {
                for j in 0..plan.columns {
                    let x = plan.sx + j;
                    let v = match from {
                        Some(o) => src_row[x * s.bytes_per_pixel() + o],
                        None if s.is_color() => 255,
                        None => s.luma_at(src_row, x),
                    };
                    dst_row[(plan.dx + j) * d.bytes_per_pixel() + to] = v;
                }
            }
        }
    }
}

fn raw_row(s: &PixelLayout, src_row: &[u8], dst_row: &mut [u8], plan: &Plan) {
    let (from, to, len) = if s.is_bit_packed() {
        (plan.sx / 8, plan.dx / 8, plan.columns.div_ceil(8))
    } else {
        let bpp = s.bytes_per_pixel();
        (plan.sx * bpp, plan.dx * bpp, plan.columns * bpp)
    };
    dst_row[to..to + len].copy_from_slice(&src_row[from..from + len]);
}

fn to_bytes_row(s: &PixelLayout, d: &PixelLayout, src_row: &[u8], dst_row: &mut [u8], plan: &Plan) {
    let copy_alpha = s.has_alpha() && d.has_alpha();
    let set_opaque = !s.is_color() && d.has_alpha();
    for j in 0..plan.columns {
        let (x, dx) = (plan.sx + j, plan.dx + j);
        d.put_rgb(dst_row, dx, s.rgb_at(src_row, x));
        if copy_alpha {
            d.put_alpha(dst_row, dx, s.alpha_at(src_row, x));
        } else if set_opaque {
            d.put_alpha(dst_row, dx, 255);
        }
    }
}

fn to_bits_row(s: &PixelLayout, d: &PixelLayout, src_row: &[u8], dst_row: &mut [u8], plan: &Plan) {
    for j in 0..plan.columns {
        let x = plan.sx + j;
        let luma = if s.is_gray() {
            src_row[x] as u32 * 1000
        } else {
            luma_1000(s.rgb_at(src_row, x))
        };
        d.put_bit(dst_row, plan.dx + j, luma >= plan.threshold_1000);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{PixelEncoding, PixelImage};
    use crate::ops::LockMode;

    fn gradient(width: usize, height: usize, encoding: PixelEncoding) -> PixelImage {
        let mut img = PixelImage::new(width, height, encoding).unwrap();
        let mut buf = img.lock_mut(LockMode::WriteOnly);
        let layout = *buf.layout();
        for y in 0..height {
            let row = buf.row_mut(y);
            for x in 0..width {
                let v = ((x * 37 + y * 11) % 256) as u8;
                layout.put_rgb(row, x, [v, v.wrapping_add(40), v.wrapping_mul(3)]);
                layout.put_alpha(row, x, 200);
            }
        }
        drop(buf);
        img
    }

    fn copy(src: &PixelImage, dst: &mut PixelImage, opts: &CopyOptions) -> Result<()> {
        let parts = Partitioner::new(4, 1);
        copy_pixels(&parts, &src.lock(), &mut dst.lock_mut(LockMode::WriteOnly), opts)
    }

    #[test]
    fn test_identical_layout_copies_bytes_exactly() {
        let src = gradient(13, 9, PixelEncoding::Bgra);
        let mut dst = src.copy_blank();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        assert_eq!(src.as_bytes(), dst.as_bytes());
    }

    #[test]
    fn test_rgb_to_bgr_remaps_channels() {
        let src = PixelImage::from_raw(
            vec![10, 20, 30],
            PixelLayout::new(1, 1, PixelEncoding::Rgb),
        )
        .unwrap();
        let mut dst = PixelImage::new(1, 1, PixelEncoding::Bgr).unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        assert_eq!(dst.as_bytes(), &[30, 20, 10]);
    }

    #[test]
    fn test_rgb_to_rgba_keeps_destination_alpha() {
        let src = PixelImage::from_raw(vec![1, 2, 3], PixelLayout::new(1, 1, PixelEncoding::Rgb))
            .unwrap();
        let mut dst =
            PixelImage::from_raw(vec![0, 0, 0, 77], PixelLayout::new(1, 1, PixelEncoding::Rgba))
                .unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        assert_eq!(dst.as_bytes(), &[1, 2, 3, 77]);
    }

    #[test]
    fn test_gray_to_rgba_sets_opaque_alpha() {
        let src =
            PixelImage::from_raw(vec![90], PixelLayout::new(1, 1, PixelEncoding::Gray8)).unwrap();
        let mut dst = PixelImage::new(1, 1, PixelEncoding::Bgra).unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        assert_eq!(dst.as_bytes(), &[90, 90, 90, 255]);
    }

    #[test]
    fn test_rgb_to_gray_uses_integer_weights() {
        let src =
            PixelImage::from_raw(vec![200, 100, 50], PixelLayout::new(1, 1, PixelEncoding::Rgb))
                .unwrap();
        let mut dst = PixelImage::new(1, 1, PixelEncoding::Gray8).unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        // (200*299 + 100*587 + 50*114) / 1000 = 124
        assert_eq!(dst.as_bytes(), &[124]);
    }

    #[test]
    fn test_gray_rgb_gray_is_lossless() {
        let src = gradient(21, 7, PixelEncoding::Gray8);
        let mut rgb = PixelImage::new(21, 7, PixelEncoding::Rgb).unwrap();
        let mut back = src.copy_blank();
        copy(&src, &mut rgb, &CopyOptions::default()).unwrap();
        copy(&rgb, &mut back, &CopyOptions::default()).unwrap();
        assert_eq!(src.as_bytes(), back.as_bytes());
    }

    #[test]
    fn test_bits_expand_to_white_and_black() {
        let src = PixelImage::from_raw(
            vec![0b1010_0000],
            PixelLayout::new(3, 1, PixelEncoding::Bit),
        )
        .unwrap();
        let mut dst = PixelImage::new(3, 1, PixelEncoding::Gray8).unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        assert_eq!(dst.as_bytes(), &[255, 0, 255]);
    }

    #[test]
    fn test_inverted_bits_expand_with_opposite_sense() {
        let src = PixelImage::from_raw(
            vec![0b1010_0000],
            PixelLayout::new(3, 1, PixelEncoding::InvertedBit),
        )
        .unwrap();
        let mut dst = PixelImage::new(3, 1, PixelEncoding::Rgb).unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        assert_eq!(dst.as_bytes(), &[0, 0, 0, 255, 255, 255, 0, 0, 0]);
    }

    #[test]
    fn test_gray_to_bits_thresholds_at_midpoint() {
        let src = PixelImage::from_raw(
            vec![0, 127, 128, 255],
            PixelLayout::new(4, 1, PixelEncoding::Gray8),
        )
        .unwrap();
        let mut dst = PixelImage::new(4, 1, PixelEncoding::Bit).unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        // Threshold 127500: 127000 is black, 128000 is white.
        assert_eq!(dst.as_bytes(), &[0b0011_0000]);
    }

    #[test]
    fn test_bits_to_inverted_bits_flip_raw_values() {
        let src = PixelImage::from_raw(
            vec![0b1100_0000],
            PixelLayout::new(4, 1, PixelEncoding::Bit),
        )
        .unwrap();
        let mut dst = PixelImage::new(4, 1, PixelEncoding::InvertedBit).unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        assert_eq!(dst.as_bytes(), &[0b0011_0000]);
    }

    #[test]
    fn test_destination_offset_places_sub_image() {
        let src =
            PixelImage::from_raw(vec![9, 9, 9, 9], PixelLayout::new(2, 2, PixelEncoding::Gray8))
                .unwrap();
        let mut dst = PixelImage::new(4, 3, PixelEncoding::Gray8).unwrap();
        copy(&src, &mut dst, &CopyOptions::at(1, 1)).unwrap();
        assert_eq!(
            dst.as_bytes(),
            &[0, 0, 0, 0, 0, 9, 9, 0, 0, 9, 9, 0]
        );
    }

    #[test]
    fn test_unaligned_bit_offset_preserves_neighbors() {
        let src = PixelImage::from_raw(vec![0xFF], PixelLayout::new(3, 1, PixelEncoding::Bit))
            .unwrap();
        let mut dst = PixelImage::new(8, 1, PixelEncoding::Bit).unwrap();
        copy(&src, &mut dst, &CopyOptions::at(2, 0)).unwrap();
        assert_eq!(dst.as_bytes(), &[0b0011_1000]);
    }

    #[test]
    fn test_source_window_crops() {
        let src = gradient(10, 10, PixelEncoding::Rgb);
        let mut dst = PixelImage::new(3, 2, PixelEncoding::Rgb).unwrap();
        copy(&src, &mut dst, &CopyOptions::window(4, 5, 3, 2)).unwrap();
        let (s, d) = (src.lock(), dst.lock());
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(d.rgb(x, y), s.rgb(x + 4, y + 5));
            }
        }
    }

    #[test]
    fn test_inverted_destination_flips_rows() {
        let src =
            PixelImage::from_raw(vec![1, 2, 3], PixelLayout::new(1, 3, PixelEncoding::Gray8))
                .unwrap();
        let mut dst =
            PixelImage::with_layout(PixelLayout::new(1, 3, PixelEncoding::Gray8).with_invert_y(true))
                .unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        assert_eq!(dst.as_bytes(), &[3, 2, 1]);
        assert_eq!(dst.lock().luma(0, 0), 1);
    }

    #[test]
    fn test_oversized_window_fails_before_writing() {
        let src = gradient(5, 5, PixelEncoding::Rgb);
        let mut dst = PixelImage::new(4, 4, PixelEncoding::Rgb).unwrap();
        let err = copy(&src, &mut dst, &CopyOptions::default()).unwrap_err();
        assert!(matches!(err, ScanpixError::InvalidOffset(_)));
        assert!(dst.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_inverted_source_is_rejected() {
        let src =
            PixelImage::with_layout(PixelLayout::new(2, 2, PixelEncoding::Gray8).with_invert_y(true))
                .unwrap();
        let mut dst = PixelImage::new(2, 2, PixelEncoding::Gray8).unwrap();
        assert!(copy(&src, &mut dst, &CopyOptions::default()).is_err());
    }

    #[test]
    fn test_gray_frames_assemble_into_rgb() {
        let frame = |v: u8| {
            PixelImage::from_raw(vec![v; 6], PixelLayout::new(3, 2, PixelEncoding::Gray8)).unwrap()
        };
        let mut dst = PixelImage::new(3, 2, PixelEncoding::Bgra).unwrap();
        for (channel, v) in [(Channel::Red, 10), (Channel::Green, 20), (Channel::Blue, 30)] {
            let opts = CopyOptions::default().with_dest_channel(channel);
            copy(&frame(v), &mut dst, &opts).unwrap();
        }
        let buf = dst.lock();
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(buf.rgb(x, y), [10, 20, 30]);
            }
        }
        assert!(dst.as_bytes().chunks_exact(4).all(|px| px[3] == 0), "alpha untouched");
    }

    #[test]
    fn test_channel_copy_from_color_source_takes_matching_channel() {
        let src = PixelImage::from_raw(vec![1, 2, 3], PixelLayout::new(1, 1, PixelEncoding::Rgb))
            .unwrap();
        let mut dst =
            PixelImage::from_raw(vec![9, 9, 9], PixelLayout::new(1, 1, PixelEncoding::Bgr))
                .unwrap();
        copy(&src, &mut dst, &CopyOptions::default().with_dest_channel(Channel::Green)).unwrap();
        assert_eq!(dst.as_bytes(), &[9, 2, 9]);
    }

    #[test]
    fn test_channel_copy_needs_color_destination() {
        let src = PixelImage::new(2, 2, PixelEncoding::Gray8).unwrap();
        let mut gray = PixelImage::new(2, 2, PixelEncoding::Gray8).unwrap();
        let opts = CopyOptions::default().with_dest_channel(Channel::Red);
        let err = copy(&src, &mut gray, &opts).unwrap_err();
        assert!(matches!(err, ScanpixError::UnsupportedFormat { .. }));

        let mut rgb = PixelImage::new(2, 2, PixelEncoding::Rgb).unwrap();
        let opts = CopyOptions::default().with_dest_channel(Channel::Alpha);
        assert!(matches!(copy(&src, &mut rgb, &opts), Err(ScanpixError::InvalidLayout(_))));
    }

    #[test]
    fn test_explicit_threshold_moves_cut_off() {
        let src = PixelImage::from_raw(vec![100], PixelLayout::new(1, 1, PixelEncoding::Gray8))
            .unwrap();
        let mut dst = PixelImage::new(1, 1, PixelEncoding::Bit).unwrap();
        copy(&src, &mut dst, &CopyOptions::default()).unwrap();
        assert_eq!(dst.as_bytes(), &[0]);
        copy(&src, &mut dst, &CopyOptions::default().with_threshold(-0.5)).unwrap();
        assert_eq!(dst.as_bytes(), &[0x80]);
    }
}
