//! Blank-page detection.
//!
//! Counts pixels darker than a white cut-off, ignoring a 1% margin on each
//! edge where scanner shadows live, and compares the share of such pixels
//! against a small coverage threshold.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::{PixelBuffer, luma_1000};
use crate::config::BlankDetectionConfig;
use crate::error::{Result, check_range};
use crate::ops::{Partitioner, scan_rows};

const WHITE_MIN: f64 = 1.0;
const WHITE_MAX: f64 = 255.0;
const COVERAGE_MAX: f64 = 0.01;
const IGNORE_EDGE_FRACTION: f64 = 0.01;

/// Result of [`detect_blank`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlankReport {
    /// Non-white pixels divided by all pixels.
    pub coverage: f64,
    pub is_blank: bool,
}

/// Decide whether `src` is an empty page.
///
/// `white_threshold` (0–100) maps to a luma cut-off in [1, 255];
/// `coverage_threshold` (0–100) maps to a fraction in [0, 0.01].
pub fn detect_blank(
    parts: &Partitioner,
    src: &PixelBuffer<'_>,
    thresholds: &BlankDetectionConfig,
) -> Result<BlankReport> {
    check_range("white_threshold", thresholds.white_threshold as f64, 0.0, 100.0, "[0, 100]")?;
    check_range(
        "coverage_threshold",
        thresholds.coverage_threshold as f64,
        0.0,
        100.0,
        "[0, 100]",
    )?;
    let white = (WHITE_MIN + thresholds.white_threshold as f64 / 100.0 * (WHITE_MAX - WHITE_MIN))
        .round() as u32;
    let coverage_threshold = thresholds.coverage_threshold as f64 / 100.0 * COVERAGE_MAX;

    let layout = *src.layout();
    let (w, h) = (layout.width(), layout.height());
    let (start_x, end_x) = margins(w);
    let (start_y, end_y) = margins(h);

    let matches = scan_rows(
        parts,
        src,
        0u64,
        |src, rows| {
            let mut count = 0u64;
            for py in rows {
                let y = layout.physical_row(py);
                if y < start_y || y > end_y {
                    continue;
                }
                let row = src.row(py);
                for x in start_x..=end_x.min(w - 1) {
                    let dark = match layout.bytes_per_pixel() {
                        0 => !layout.bit_is_white(row, x),
                        1 => (row[x] as u32) < white,
                        _ => luma_1000(layout.rgb_at(row, x)) < white * 1000,
                    };
                    count += dark as u64;
                }
            }
            Ok(count)
        },
        |total, count| *total += count,
    )?;

    let coverage = matches as f64 / (w * h) as f64;
    let report = BlankReport {
        coverage,
        is_blank: coverage < coverage_threshold,
    };
    debug!(white, coverage_threshold, coverage, is_blank = report.is_blank, "blank detection");
    Ok(report)
}

/// Inclusive range of positions counted along one axis.
fn margins(len: usize) -> (usize, usize) {
    let start = (len as f64 * IGNORE_EDGE_FRACTION) as usize;
    let end = (len as f64 * (1.0 - IGNORE_EDGE_FRACTION)) as usize;
    (start, end)
}
