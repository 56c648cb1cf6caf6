//! Smallest encoding that represents a buffer's content without loss.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::ops::{Partitioner, scan_rows};

/// Content class of a buffer, from most to least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicalPixelFormat {
    /// Opaque pure black and white only.
    Bitonal,
    /// Opaque, R = G = B.
    Gray,
    /// Opaque color.
    Rgb,
    /// Some pixel is not fully opaque.
    Rgba,
}

/// Flags that stay true until a pixel disproves them.
#[derive(Debug, Clone, Copy)]
struct Candidates {
    bitonal: bool,
    gray: bool,
    opaque: bool,
}

impl Candidates {
    const ALL: Self = Self {
        bitonal: true,
        gray: true,
        opaque: true,
    };

    fn settled(&self) -> bool {
        !self.bitonal && !self.gray && !self.opaque
    }

    fn merge(&mut self, other: Self) {
        self.bitonal &= other.bitonal;
        self.gray &= other.gray;
        self.opaque &= other.opaque;
    }

    fn format(&self) -> LogicalPixelFormat {
        match (self.opaque, self.gray, self.bitonal) {
            (false, _, _) => LogicalPixelFormat::Rgba,
            (true, true, true) => LogicalPixelFormat::Bitonal,
            (true, true, false) => LogicalPixelFormat::Gray,
            (true, false, _) => LogicalPixelFormat::Rgb,
        }
    }
}

/// Scan `src` and report the minimal lossless format for its pixels.
///
/// 1-bit buffers are bitonal by definition and are not scanned. Each
/// partition stops early once every candidate has been ruled out.
pub fn logical_format(parts: &Partitioner, src: &PixelBuffer<'_>) -> Result<LogicalPixelFormat> {
    let layout = *src.layout();
    if layout.is_bit_packed() {
        return Ok(LogicalPixelFormat::Bitonal);
    }

    let found = scan_rows(
        parts,
        src,
        Candidates::ALL,
        |src, rows| {
            let mut c = Candidates::ALL;
            if layout.is_gray() {
                // Always gray and opaque; only the bitonal test applies.
                'gray: for y in rows {
                    for &v in src.row(y) {
                        if v != 0 && v != 255 {
                            c.bitonal = false;
                            break 'gray;
                        }
                    }
                }
                return Ok(c);
            }
            'rows: for y in rows {
                let row = src.row(y);
                for x in 0..layout.width() {
                    let [r, g, b] = layout.rgb_at(row, x);
                    if c.opaque && layout.alpha_at(row, x) != 255 {
                        c.opaque = false;
                    }
                    if c.gray && (r != g || g != b) {
                        c.gray = false;
                    }
                    if c.bitonal && (r != g || g != b || (r != 0 && r != 255)) {
                        c.bitonal = false;
                    }
                    if c.settled() {
                        break 'rows;
                    }
                }
            }
            Ok(c)
        },
        |acc, partial| acc.merge(partial),
    )?;

    let format = found.format();
    debug!(encoding = %layout.encoding(), ?format, "logical pixel format");
    Ok(format)
}
