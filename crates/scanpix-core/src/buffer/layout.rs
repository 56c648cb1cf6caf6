//! Pixel encodings and the geometry of a locked buffer.
//!
//! A [`PixelLayout`] carries everything needed to address a pixel: row
//! stride, bytes per pixel, channel byte offsets, and the two orientation
//! flags. Byte-aligned pixels live at `row_start + x * bytes_per_pixel`;
//! bit-packed rows store pixel `x` in bit `7 - (x % 8)` of byte `x / 8`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ScanpixError};

/// Named storage encodings accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelEncoding {
    /// 24-bit, bytes ordered R, G, B.
    Rgb,
    /// 24-bit, bytes ordered B, G, R.
    Bgr,
    /// 32-bit, bytes ordered R, G, B, A.
    Rgba,
    /// 32-bit, bytes ordered B, G, R, A (little-endian ARGB).
    Bgra,
    /// 8-bit luma.
    Gray8,
    /// 1-bit, MSB first, set bit = white.
    Bit,
    /// 1-bit, MSB first, set bit = black.
    InvertedBit,
}

impl PixelEncoding {
    /// Bits used by a single pixel.
    pub const fn bits_per_pixel(self) -> usize {
        match self {
            Self::Rgb | Self::Bgr => 24,
            Self::Rgba | Self::Bgra => 32,
            Self::Gray8 => 8,
            Self::Bit | Self::InvertedBit => 1,
        }
    }

    /// Bytes used by a single pixel, or 0 for bit-packed encodings.
    pub const fn bytes_per_pixel(self) -> usize {
        self.bits_per_pixel() / 8
    }

    pub const fn is_bit_packed(self) -> bool {
        matches!(self, Self::Bit | Self::InvertedBit)
    }

    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba | Self::Bgra)
    }

    /// Default channel positions for this encoding.
    pub const fn channel_offsets(self) -> ChannelOffsets {
        match self {
            Self::Rgb => ChannelOffsets::rgb(0, 1, 2),
            Self::Bgr => ChannelOffsets::rgb(2, 1, 0),
            Self::Rgba => ChannelOffsets::rgba(0, 1, 2, 3),
            Self::Bgra => ChannelOffsets::rgba(2, 1, 0, 3),
            Self::Gray8 | Self::Bit | Self::InvertedBit => ChannelOffsets::rgb(0, 0, 0),
        }
    }

    /// Human-readable label for logs and error messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rgb => "RGB24",
            Self::Bgr => "BGR24",
            Self::Rgba => "RGBA32",
            Self::Bgra => "BGRA32",
            Self::Gray8 => "Gray8",
            Self::Bit => "BW1",
            Self::InvertedBit => "BW1 (inverted)",
        }
    }
}

impl fmt::Display for PixelEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Byte offset of each channel within one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelOffsets {
    pub red: usize,
    pub green: usize,
    pub blue: usize,
    pub alpha: Option<usize>,
}

impl ChannelOffsets {
    pub const fn rgb(red: usize, green: usize, blue: usize) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: None,
        }
    }

    pub const fn rgba(red: usize, green: usize, blue: usize, alpha: usize) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: Some(alpha),
        }
    }

    /// Byte offset of `channel`, or `None` for a missing alpha channel.
    pub const fn of(&self, channel: Channel) -> Option<usize> {
        match channel {
            Channel::Red => Some(self.red),
            Channel::Green => Some(self.green),
            Channel::Blue => Some(self.blue),
            Channel::Alpha => self.alpha,
        }
    }
}

/// One color channel of a byte-per-pixel color layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

/// Geometry and channel encoding of a buffer.
///
/// Construct with [`PixelLayout::new`] and adjust with the `with_*`
/// builders; invariants are checked by [`PixelLayout::validate`], which
/// every buffer view runs before exposing any memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelLayout {
    width: usize,
    height: usize,
    stride: usize,
    encoding: PixelEncoding,
    bits_per_pixel: usize,
    bytes_per_pixel: usize,
    offsets: ChannelOffsets,
    invert_y: bool,
    bit_inverted: bool,
}

impl PixelLayout {
    /// Tightly packed layout (no row padding) for a named encoding.
    pub fn new(width: usize, height: usize, encoding: PixelEncoding) -> Self {
        Self {
            width,
            height,
            stride: min_stride(width, encoding.bits_per_pixel()),
            encoding,
            bits_per_pixel: encoding.bits_per_pixel(),
            bytes_per_pixel: encoding.bytes_per_pixel(),
            offsets: encoding.channel_offsets(),
            invert_y: false,
            bit_inverted: encoding == PixelEncoding::InvertedBit,
        }
    }

    /// Override the row stride in bytes.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Override the channel positions (e.g. an ARGB byte order).
    pub fn with_offsets(mut self, offsets: ChannelOffsets) -> Self {
        self.offsets = offsets;
        self
    }

    /// Store rows bottom-up: logical row 0 is the last row in memory.
    pub fn with_invert_y(mut self, invert_y: bool) -> Self {
        self.invert_y = invert_y;
        self
    }

    /// Override the declared depth. Only useful for describing foreign
    /// buffers; [`validate`](Self::validate) rejects inconsistent values.
    pub fn with_depth(mut self, bits_per_pixel: usize, bytes_per_pixel: usize) -> Self {
        self.bits_per_pixel = bits_per_pixel;
        self.bytes_per_pixel = bytes_per_pixel;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    pub fn bits_per_pixel(&self) -> usize {
        self.bits_per_pixel
    }

    /// 0 for bit-packed rows.
    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    pub fn offsets(&self) -> ChannelOffsets {
        self.offsets
    }

    pub fn invert_y(&self) -> bool {
        self.invert_y
    }

    pub fn bit_inverted(&self) -> bool {
        self.bit_inverted
    }

    pub fn is_bit_packed(&self) -> bool {
        self.bytes_per_pixel == 0
    }

    pub fn is_gray(&self) -> bool {
        self.bytes_per_pixel == 1
    }

    /// 3 or 4 bytes per pixel.
    pub fn is_color(&self) -> bool {
        self.bytes_per_pixel >= 3
    }

    pub fn has_alpha(&self) -> bool {
        self.offsets.alpha.is_some()
    }

    /// Bytes of pixel data in one row, excluding stride padding.
    pub fn row_bytes(&self) -> usize {
        min_stride(self.width, self.bits_per_pixel)
    }

    /// Minimum slice length able to hold every row.
    pub fn required_len(&self) -> usize {
        if self.height == 0 {
            0
        } else {
            self.stride * (self.height - 1) + self.row_bytes()
        }
    }

    /// Memory row holding logical row `y`.
    pub fn physical_row(&self, y: usize) -> usize {
        if self.invert_y {
            self.height - 1 - y
        } else {
            y
        }
    }

    /// Two layouts whose rows can be copied byte for byte.
    pub fn same_bit_layout(&self, other: &PixelLayout) -> bool {
        self.bits_per_pixel == other.bits_per_pixel
            && self.bytes_per_pixel == other.bytes_per_pixel
            && self.offsets == other.offsets
            && self.bit_inverted == other.bit_inverted
    }

    /// Check the structural invariants of the layout.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ScanpixError::InvalidLayout(format!(
                "empty buffer {}x{}",
                self.width, self.height
            )));
        }
        if !matches!(self.bits_per_pixel, 1 | 8 | 24 | 32) {
            return Err(ScanpixError::InvalidLayout(format!(
                "unsupported depth of {} bits per pixel",
                self.bits_per_pixel
            )));
        }
        let expected_bytes = if self.bits_per_pixel == 1 {
            0
        } else {
            self.bits_per_pixel / 8
        };
        if self.bytes_per_pixel != expected_bytes {
            return Err(ScanpixError::InvalidLayout(format!(
                "{} bytes per pixel is inconsistent with {} bits per pixel",
                self.bytes_per_pixel, self.bits_per_pixel
            )));
        }
        if self.stride < self.row_bytes() {
            return Err(ScanpixError::InvalidLayout(format!(
                "stride {} is shorter than a {}-pixel row ({} bytes)",
                self.stride,
                self.width,
                self.row_bytes()
            )));
        }
        if self.bit_inverted && self.bytes_per_pixel != 0 {
            return Err(ScanpixError::InvalidLayout(
                "bit inversion only applies to 1-bit buffers".to_string(),
            ));
        }
        self.validate_offsets()
    }

    fn validate_offsets(&self) -> Result<()> {
        let o = self.offsets;
        if self.bytes_per_pixel < 3 {
            if o.alpha.is_some() {
                return Err(ScanpixError::InvalidLayout(
                    "alpha requires 4 bytes per pixel".to_string(),
                ));
            }
            return Ok(());
        }
        let mut channels = vec![o.red, o.green, o.blue];
        match (o.alpha, self.bytes_per_pixel) {
            (Some(a), 4) => channels.push(a),
            (Some(_), _) => {
                return Err(ScanpixError::InvalidLayout(
                    "alpha requires 4 bytes per pixel".to_string(),
                ));
            }
            (None, _) => {}
        }
        if channels.iter().any(|&c| c >= self.bytes_per_pixel) {
            return Err(ScanpixError::InvalidLayout(format!(
                "channel offsets {channels:?} exceed {} bytes per pixel",
                self.bytes_per_pixel
            )));
        }
        let mut sorted = channels.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != channels.len() {
            return Err(ScanpixError::InvalidLayout(format!(
                "overlapping channel offsets {channels:?}"
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Pixel addressing
    // ------------------------------------------------------------------------

    /// Red, green, blue of pixel `x` in `row`. Gray pixels replicate luma.
    #[inline]
    pub fn rgb_at(&self, row: &[u8], x: usize) -> [u8; 3] {
        if self.bytes_per_pixel == 0 {
            let v = if self.bit_is_white(row, x) { 255 } else { 0 };
            return [v, v, v];
        }
        let p = x * self.bytes_per_pixel;
        [
            row[p + self.offsets.red],
            row[p + self.offsets.green],
            row[p + self.offsets.blue],
        ]
    }

    /// Alpha of pixel `x`, or 255 when the layout has no alpha channel.
    #[inline]
    pub fn alpha_at(&self, row: &[u8], x: usize) -> u8 {
        match self.offsets.alpha {
            Some(a) => row[x * self.bytes_per_pixel + a],
            None => 255,
        }
    }

    /// Weighted luma of pixel `x` (0–255).
    #[inline]
    pub fn luma_at(&self, row: &[u8], x: usize) -> u8 {
        match self.bytes_per_pixel {
            0 => {
                if self.bit_is_white(row, x) {
                    255
                } else {
                    0
                }
            }
            1 => row[x],
            _ => luma(self.rgb_at(row, x)),
        }
    }

    /// Write red, green, blue of pixel `x`. Gray rows receive luma.
    #[inline]
    pub fn put_rgb(&self, row: &mut [u8], x: usize, rgb: [u8; 3]) {
        match self.bytes_per_pixel {
            0 => self.put_bit(row, x, luma(rgb) >= 128),
            1 => row[x] = luma(rgb),
            bpp => {
                let p = x * bpp;
                row[p + self.offsets.red] = rgb[0];
                row[p + self.offsets.green] = rgb[1];
                row[p + self.offsets.blue] = rgb[2];
            }
        }
    }

    /// Write alpha of pixel `x`; ignored when the layout has no alpha.
    #[inline]
    pub fn put_alpha(&self, row: &mut [u8], x: usize, alpha: u8) {
        if let Some(a) = self.offsets.alpha {
            row[x * self.bytes_per_pixel + a] = alpha;
        }
    }

    /// Raw bit value of pixel `x` in a bit-packed row.
    #[inline]
    pub fn raw_bit(row: &[u8], x: usize) -> bool {
        (row[x / 8] >> (7 - (x % 8))) & 1 == 1
    }

    /// Whether pixel `x` of a bit-packed row is white, honoring inversion.
    #[inline]
    pub fn bit_is_white(&self, row: &[u8], x: usize) -> bool {
        Self::raw_bit(row, x) != self.bit_inverted
    }

    /// Set pixel `x` of a bit-packed row to white or black.
    #[inline]
    pub fn put_bit(&self, row: &mut [u8], x: usize, white: bool) {
        let mask = 0x80u8 >> (x % 8);
        if white != self.bit_inverted {
            row[x / 8] |= mask;
        } else {
            row[x / 8] &= !mask;
        }
    }
}

/// Integer luma weights per 1000.
pub const LUMA_WEIGHTS: [u32; 3] = [299, 587, 114];

/// Luma scaled by 1000 (0–255000).
#[inline]
pub fn luma_1000(rgb: [u8; 3]) -> u32 {
    rgb[0] as u32 * LUMA_WEIGHTS[0] + rgb[1] as u32 * LUMA_WEIGHTS[1] + rgb[2] as u32 * LUMA_WEIGHTS[2]
}

/// Weighted luma (0–255).
#[inline]
pub fn luma(rgb: [u8; 3]) -> u8 {
    (luma_1000(rgb) / 1000) as u8
}

fn min_stride(width: usize, bits_per_pixel: usize) -> usize {
    if bits_per_pixel == 1 {
        width.div_ceil(8)
    } else {
        width * (bits_per_pixel / 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_layout_strides() {
        assert_eq!(PixelLayout::new(10, 2, PixelEncoding::Rgb).stride(), 30);
        assert_eq!(PixelLayout::new(10, 2, PixelEncoding::Bgra).stride(), 40);
        assert_eq!(PixelLayout::new(10, 2, PixelEncoding::Gray8).stride(), 10);
        assert_eq!(PixelLayout::new(10, 2, PixelEncoding::Bit).stride(), 2);
    }

    #[test]
    fn test_required_len_ignores_last_row_padding() {
        let layout = PixelLayout::new(5, 3, PixelEncoding::Rgb).with_stride(16);
        assert_eq!(layout.required_len(), 16 * 2 + 15);
    }

    #[test]
    fn test_validate_rejects_short_stride() {
        let layout = PixelLayout::new(5, 3, PixelEncoding::Rgb).with_stride(14);
        assert!(matches!(layout.validate(), Err(ScanpixError::InvalidLayout(_))));
    }

    #[test]
    fn test_validate_rejects_inconsistent_depth() {
        let layout = PixelLayout::new(5, 3, PixelEncoding::Rgb).with_depth(24, 4);
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlapping_offsets() {
        let layout =
            PixelLayout::new(5, 3, PixelEncoding::Rgb).with_offsets(ChannelOffsets::rgb(0, 0, 2));
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_alpha_without_fourth_byte() {
        let layout = PixelLayout::new(5, 3, PixelEncoding::Rgb)
            .with_offsets(ChannelOffsets::rgba(0, 1, 2, 3));
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_argb_order() {
        let layout = PixelLayout::new(5, 3, PixelEncoding::Rgba)
            .with_offsets(ChannelOffsets::rgba(1, 2, 3, 0));
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_bit_addressing_is_msb_first() {
        let layout = PixelLayout::new(10, 1, PixelEncoding::Bit);
        let row = [0b1000_0001u8, 0b0100_0000];
        assert!(layout.bit_is_white(&row, 0));
        assert!(!layout.bit_is_white(&row, 1));
        assert!(layout.bit_is_white(&row, 7));
        assert!(layout.bit_is_white(&row, 9));
    }

    #[test]
    fn test_inverted_bits_flip_meaning() {
        let layout = PixelLayout::new(8, 1, PixelEncoding::InvertedBit);
        let mut row = [0u8];
        assert!(layout.bit_is_white(&row, 3));
        layout.put_bit(&mut row, 3, false);
        assert_eq!(row[0], 0b0001_0000);
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma([255, 255, 255]), 255);
        assert_eq!(luma([0, 0, 0]), 0);
        assert_eq!(luma_1000([100, 0, 0]), 29_900);
    }

    #[test]
    fn test_bgr_channel_positions() {
        let layout = PixelLayout::new(1, 1, PixelEncoding::Bgr);
        let row = [10u8, 20, 30];
        assert_eq!(layout.rgb_at(&row, 0), [30, 20, 10]);
    }
}
