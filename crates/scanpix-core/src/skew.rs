//! Skew estimation with a Hough transform over text baselines.
//!
//! Every black pixel with a non-black pixel directly below it is treated as
//! a point on a baseline and votes for all lines through it:
//!
//! ```text
//! d = y·cos(α) − x·sin(α)     α ∈ [−20°, 20°) in 0.2° steps
//! ```
//!
//! The strongest cells share the page's skew angle. Only the middle half of
//! the rows is scanned, which keeps headers, footers and scanner edges out.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::PixelBuffer;

const ANGLE_MIN: f64 = -20.0;
const ANGLE_STEP: f64 = 0.2;
const ANGLE_STEPS: usize = 200;
const BLACK_THRESHOLD: u8 = 140;
/// Cells averaged into the final estimate.
pub const BEST_LINE_COUNT: usize = 20;

static SIN_COS: LazyLock<[(f64, f64); ANGLE_STEPS]> = LazyLock::new(|| {
    std::array::from_fn(|i| angle_of(i).to_radians().sin_cos())
});

/// One accumulator cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoughLine {
    pub votes: u32,
    /// Degrees; positive when the line descends to the right.
    pub angle: f64,
    /// Perpendicular distance from the origin in pixels.
    pub distance: f64,
}

fn angle_of(index: usize) -> f64 {
    ANGLE_MIN + ANGLE_STEP * index as f64
}

/// The `count` accumulator cells with the most votes, strongest first.
/// Cells with equal votes keep the order in which they were reached.
pub fn best_lines(src: &PixelBuffer<'_>, count: usize) -> Vec<HoughLine> {
    if count == 0 {
        return Vec::new();
    }
    let (w, h) = (src.width(), src.height());
    let sin_cos = &*SIN_COS;
    // d ranges over (−w·sin 20°, h + w·sin 20°), so d − d_min stays inside
    // (0, h + 1.35·w) and 2·(w + h) buckets always cover it.
    let d_min = -(w as f64);
    let d_count = 2 * (w + h);
    let mut votes = vec![0u32; d_count * ANGLE_STEPS];

    let is_black = |x: usize, y: usize| src.luma(x, y) < BLACK_THRESHOLD;
    let mut edges = 0usize;
    for y in h / 4..(3 * h / 4).min(h.saturating_sub(1)) {
        for x in 0..w {
            if !is_black(x, y) || is_black(x, y + 1) {
                continue;
            }
            edges += 1;
            for (i, &(sin, cos)) in sin_cos.iter().enumerate() {
                let d = y as f64 * cos - x as f64 * sin;
                let bucket = (d - d_min).floor() as usize;
                votes[bucket * ANGLE_STEPS + i] += 1;
            }
        }
    }

    // Partial selection: keep a sorted top list, inserting only on a strict win.
    let mut best: Vec<HoughLine> = Vec::with_capacity(count + 1);
    for (cell, &v) in votes.iter().enumerate() {
        if v == 0 || (best.len() == count && best[count - 1].votes >= v) {
            continue;
        }
        let pos = best.partition_point(|line| line.votes >= v);
        let (bucket, i) = (cell / ANGLE_STEPS, cell % ANGLE_STEPS);
        best.insert(
            pos,
            HoughLine {
                votes: v,
                angle: angle_of(i),
                distance: bucket as f64 + d_min,
            },
        );
        best.truncate(count);
    }
    debug!(edges, lines = best.len(), "hough accumulator");
    best
}

/// Estimated skew of `src` in degrees: the mean angle of the 20 strongest
/// baseline cells. Positive means text lines descend to the right; rotate
/// by the negative of this to straighten. Pages with no baselines give 0.
pub fn detect_skew(src: &PixelBuffer<'_>) -> f64 {
    let lines = best_lines(src, BEST_LINE_COUNT);
    if lines.is_empty() {
        return 0.0;
    }
    let angle = lines.iter().map(|l| l.angle).sum::<f64>() / lines.len() as f64;
    debug!(angle, lines = lines.len(), "skew");
    angle
}
