//! Borrowed views over locked pixel memory.

use std::ops::Range;

use super::layout::PixelLayout;
use crate::error::{Result, ScanpixError};

/// Read-only view over caller-owned pixel memory.
///
/// The view borrows the memory for the duration of a lock and can never
/// outlive it.
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    layout: PixelLayout,
    data: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    /// Validate `layout` and wrap `data`. Fails before any pixel is read.
    pub fn new(data: &'a [u8], layout: PixelLayout) -> Result<Self> {
        check(&layout, data.len())?;
        Ok(Self { layout, data })
    }

    /// Wrap memory already checked against `layout`.
    pub(super) fn trusted(data: &'a [u8], layout: PixelLayout) -> Self {
        debug_assert!(check(&layout, data.len()).is_ok());
        Self { layout, data }
    }

    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    pub fn width(&self) -> usize {
        self.layout.width()
    }

    pub fn height(&self) -> usize {
        self.layout.height()
    }

    /// Pixel bytes of the memory row `y` (stride padding excluded).
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.layout.stride();
        &self.data[start..start + self.layout.row_bytes()]
    }

    /// Pixel bytes of logical row `y`, honoring vertical inversion.
    #[inline]
    pub fn logical_row(&self, y: usize) -> &'a [u8] {
        self.row(self.layout.physical_row(y))
    }

    /// Red, green, blue at logical `(x, y)`.
    pub fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
        self.layout.rgb_at(self.logical_row(y), x)
    }

    /// Alpha at logical `(x, y)`; 255 without an alpha channel.
    pub fn alpha(&self, x: usize, y: usize) -> u8 {
        self.layout.alpha_at(self.logical_row(y), x)
    }

    /// Luma at logical `(x, y)`.
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        self.layout.luma_at(self.logical_row(y), x)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }
}

/// Writable view over caller-owned pixel memory.
#[derive(Debug)]
pub struct PixelBufferMut<'a> {
    layout: PixelLayout,
    data: &'a mut [u8],
}

impl<'a> PixelBufferMut<'a> {
    /// Validate `layout` and wrap `data`. Fails before any pixel is touched.
    pub fn new(data: &'a mut [u8], layout: PixelLayout) -> Result<Self> {
        check(&layout, data.len())?;
        Ok(Self { layout, data })
    }

    /// Wrap memory already checked against `layout`.
    pub(super) fn trusted(data: &'a mut [u8], layout: PixelLayout) -> Self {
        debug_assert!(check(&layout, data.len()).is_ok());
        Self { layout, data }
    }

    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    pub fn width(&self) -> usize {
        self.layout.width()
    }

    pub fn height(&self) -> usize {
        self.layout.height()
    }

    /// Reborrow as a read-only view.
    pub fn as_buffer(&self) -> PixelBuffer<'_> {
        PixelBuffer {
            layout: self.layout,
            data: &*self.data,
        }
    }

    /// Pixel bytes of the memory row `y`.
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.layout.stride();
        let len = self.layout.row_bytes();
        &mut self.data[start..start + len]
    }

    /// Split the buffer into disjoint bands of memory rows.
    ///
    /// `ranges` must be ascending and non-overlapping.
    pub(crate) fn split_bands(&mut self, ranges: &[Range<usize>]) -> Vec<RowBand<'_>> {
        let layout = self.layout;
        let stride = layout.stride();
        let limit = layout.required_len();
        let mut rest: &mut [u8] = &mut *self.data;
        let mut consumed = 0;
        let mut bands = Vec::with_capacity(ranges.len());
        for range in ranges {
            debug_assert!(range.start * stride >= consumed, "bands must be ascending");
            let start = range.start * stride;
            let end = (range.end * stride).min(limit);
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(start - consumed);
            let (band, tail) = tail.split_at_mut(end - start);
            rest = tail;
            consumed = end;
            bands.push(RowBand {
                layout,
                first_row: range.start,
                row_count: range.len(),
                data: band,
            });
        }
        bands
    }
}

/// Contiguous memory rows of a writable buffer owned by one partition.
#[derive(Debug)]
pub struct RowBand<'a> {
    layout: PixelLayout,
    first_row: usize,
    row_count: usize,
    data: &'a mut [u8],
}

impl RowBand<'_> {
    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    /// Memory rows covered by this band.
    pub fn rows(&self) -> Range<usize> {
        self.first_row..self.first_row + self.row_count
    }

    /// Pixel bytes of memory row `y`, which must lie inside [`rows`](Self::rows).
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        debug_assert!(self.rows().contains(&y), "row {y} outside band");
        let start = (y - self.first_row) * self.layout.stride();
        let len = self.layout.row_bytes();
        &mut self.data[start..start + len]
    }
}

fn check(layout: &PixelLayout, len: usize) -> Result<()> {
    layout.validate()?;
    let needed = layout.required_len();
    if len < needed {
        return Err(ScanpixError::BufferTooSmall {
            needed,
            actual: len,
        });
    }
    Ok(())
}
