//! Per-column color calibration for sheet-fed scanners.
//!
//! A feeder scanner images each column with the same sensor element, so a
//! dim or tinted element shows up as a vertical stripe. Pass 1 records the
//! brightest value each column reaches; pass 2 scales the column so that
//! value becomes 255. Run this before anything that mixes columns (deskew,
//! scaling).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::{PixelBuffer, PixelBufferMut};
use crate::error::{Result, ScanpixError};
use crate::ops::{Partitioner, map_rows, scan_rows};

/// Share of rows at the top and at the bottom left out of pass 1.
const IGNORE_TOP_AND_BOTTOM: f64 = 0.02;

/// Brightest value per column and channel. Gray buffers only fill `red`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnCalibration {
    pub red: Vec<u8>,
    pub green: Vec<u8>,
    pub blue: Vec<u8>,
}

impl ColumnCalibration {
    fn zeroed(width: usize) -> Self {
        Self {
            red: vec![0; width],
            green: vec![0; width],
            blue: vec![0; width],
        }
    }

    fn merge(&mut self, other: &Self) {
        for (table, partial) in [
            (&mut self.red, &other.red),
            (&mut self.green, &other.green),
            (&mut self.blue, &other.blue),
        ] {
            for (a, &b) in table.iter_mut().zip(partial) {
                *a = (*a).max(b);
            }
        }
    }

    pub fn width(&self) -> usize {
        self.red.len()
    }
}

/// Pass 1: per-column channel maxima over the rows strictly between the
/// top and bottom 2%.
pub fn measure_columns(parts: &Partitioner, src: &PixelBuffer<'_>) -> Result<ColumnCalibration> {
    let layout = *src.layout();
    if layout.is_bit_packed() {
        return Err(ScanpixError::unsupported("column calibration", layout.encoding()));
    }
    let (w, h) = (layout.width(), layout.height());
    let min_y = (h as f64 * IGNORE_TOP_AND_BOTTOM) as usize;
    let max_y = (h as f64 * (1.0 - IGNORE_TOP_AND_BOTTOM)) as usize;

    scan_rows(
        parts,
        src,
        ColumnCalibration::zeroed(w),
        |src, rows| {
            let mut high = ColumnCalibration::zeroed(w);
            for py in rows {
                let y = layout.physical_row(py);
                if y <= min_y || y >= max_y {
                    continue;
                }
                let row = src.row(py);
                if layout.is_gray() {
                    for (hr, &v) in high.red.iter_mut().zip(row) {
                        *hr = (*hr).max(v);
                    }
                    continue;
                }
                for x in 0..w {
                    let [r, g, b] = layout.rgb_at(row, x);
                    high.red[x] = high.red[x].max(r);
                    high.green[x] = high.green[x].max(g);
                    high.blue[x] = high.blue[x].max(b);
                }
            }
            Ok(high)
        },
        |acc, partial| acc.merge(&partial),
    )
}

/// Pass 2: scale each channel of column `x` by `255 / max[x]`, clamped.
/// Columns whose maximum is 0 are left as they are.
pub fn apply_column_calibration(
    parts: &Partitioner,
    buf: &mut PixelBufferMut<'_>,
    calibration: &ColumnCalibration,
) -> Result<()> {
    let layout = *buf.layout();
    if layout.is_bit_packed() {
        return Err(ScanpixError::unsupported("column calibration", layout.encoding()));
    }
    if calibration.width() != layout.width() {
        return Err(ScanpixError::DimensionMismatch {
            left_width: calibration.width(),
            left_height: layout.height(),
            right_width: layout.width(),
            right_height: layout.height(),
        });
    }

    let scale = |v: u8, max: u8| -> u8 {
        if max == 0 {
            v
        } else {
            (v as u32 * 255 / max as u32).min(255) as u8
        }
    };
    map_rows(parts, buf, |band| {
        for y in band.rows() {
            let row = band.row_mut(y);
            if layout.is_gray() {
                for (v, &max) in row.iter_mut().zip(&calibration.red) {
                    *v = scale(*v, max);
                }
                continue;
            }
            for x in 0..layout.width() {
                let [r, g, b] = layout.rgb_at(row, x);
                let out = [
                    scale(r, calibration.red[x]),
                    scale(g, calibration.green[x]),
                    scale(b, calibration.blue[x]),
                ];
                layout.put_rgb(row, x, out);
            }
        }
        Ok(())
    })
}

/// Both passes in place. Returns the measured tables.
pub fn calibrate_columns(parts: &Partitioner, buf: &mut PixelBufferMut<'_>) -> Result<ColumnCalibration> {
    let calibration = measure_columns(parts, &buf.as_buffer())?;
    let skipped = calibration.red.iter().filter(|&&m| m == 0).count();
    debug!(columns = calibration.width(), skipped, "column calibration");
    apply_column_calibration(parts, buf, &calibration)?;
    Ok(calibration)
}
