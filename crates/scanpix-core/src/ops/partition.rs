//! Row partitioning and the validate → partition → merge → finish runners.
//!
//! Every operation in the crate is a plain function built on one of three
//! runners:
//!
//! - [`scan_rows`]: read-only pass; each partition returns a partial
//!   statistic which is merged into a shared accumulator under one lock.
//! - [`map_rows`]: in-place pass; each partition owns a disjoint band of
//!   memory rows.
//! - [`map_rows_into`]: source → destination pass; each partition owns a
//!   disjoint band of destination rows and may read any source row.
//!
//! The accumulator's initial value is the "start" hook and whatever the
//! caller does with the returned accumulator is the "finish" hook.

use std::ops::Range;

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::trace;

use crate::buffer::{PixelBuffer, PixelBufferMut, RowBand};
use crate::config::PartitionConfig;
use crate::error::Result;

/// Access requested from the image that owns a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Splits row ranges into contiguous, disjoint partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    max_partitions: usize,
    min_rows: usize,
}

impl Partitioner {
    pub fn new(max_partitions: usize, min_rows_per_partition: usize) -> Self {
        Self {
            max_partitions: max_partitions.max(1),
            min_rows: min_rows_per_partition.max(1),
        }
    }

    pub fn from_config(config: &PartitionConfig) -> Self {
        Self::new(
            config
                .max_partitions
                .unwrap_or_else(Self::default_max_partitions),
            config.min_rows_per_partition,
        )
    }

    /// Everything on the calling thread, in one partition.
    pub fn single() -> Self {
        Self::new(1, 1)
    }

    /// `min(4, processors / 2)`, at least 1. More workers than that just
    /// fight over memory bandwidth.
    pub fn default_max_partitions() -> usize {
        let processors = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (processors / 2).clamp(1, 4)
    }

    pub fn max_partitions(&self) -> usize {
        self.max_partitions
    }

    /// Split `rows` into at most `max_partitions` contiguous ranges of
    /// roughly equal size. Short ranges get fewer partitions.
    pub fn split(&self, rows: Range<usize>) -> Vec<Range<usize>> {
        let total = rows.len();
        if total == 0 {
            return Vec::new();
        }
        let count = (total / self.min_rows).clamp(1, self.max_partitions);
        let chunk = total.div_ceil(count);
        (0..count)
            .map(|i| {
                let start = rows.start + i * chunk;
                let end = (start + chunk).min(rows.end);
                start..end
            })
            .filter(|r| !r.is_empty())
            .collect()
    }
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::from_config(&PartitionConfig::default())
    }
}

/// Read-only partitioned pass with a merged accumulator.
///
/// `work` sees the whole buffer plus its own memory-row range. `merge`
/// folds each partial result into `acc` while holding the accumulator lock.
pub fn scan_rows<A, P, W, M>(
    parts: &Partitioner,
    src: &PixelBuffer<'_>,
    acc: A,
    work: W,
    merge: M,
) -> Result<A>
where
    A: Send,
    P: Send,
    W: Fn(&PixelBuffer<'_>, Range<usize>) -> Result<P> + Sync,
    M: Fn(&mut A, P) + Sync,
{
    let ranges = parts.split(0..src.height());
    trace!(partitions = ranges.len(), rows = src.height(), "scan_rows");
    let shared = Mutex::new(acc);
    ranges.into_par_iter().try_for_each(|rows| -> Result<()> {
        let partial = work(src, rows)?;
        merge(&mut *shared.lock(), partial);
        Ok(())
    })?;
    Ok(shared.into_inner())
}

/// In-place partitioned pass. Each call to `work` owns one band of rows.
pub fn map_rows<W>(parts: &Partitioner, buf: &mut PixelBufferMut<'_>, work: W) -> Result<()>
where
    W: Fn(&mut RowBand<'_>) -> Result<()> + Sync,
{
    let ranges = parts.split(0..buf.height());
    trace!(partitions = ranges.len(), rows = buf.height(), "map_rows");
    let mut bands = buf.split_bands(&ranges);
    bands.par_iter_mut().try_for_each(|band| work(band))
}

/// Source → destination partitioned pass over the destination memory
/// rows `dst_rows`. `work` may read any source row but writes only its band.
pub fn map_rows_into<W>(
    parts: &Partitioner,
    src: &PixelBuffer<'_>,
    dst: &mut PixelBufferMut<'_>,
    dst_rows: Range<usize>,
    work: W,
) -> Result<()>
where
    W: Fn(&PixelBuffer<'_>, &mut RowBand<'_>) -> Result<()> + Sync,
{
    debug_assert!(dst_rows.end <= dst.height());
    let ranges = parts.split(dst_rows);
    trace!(partitions = ranges.len(), "map_rows_into");
    let mut bands = dst.split_bands(&ranges);
    bands.par_iter_mut().try_for_each(|band| work(src, band))
}
