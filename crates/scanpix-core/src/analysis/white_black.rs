//! Automatic white/black-point correction.
//!
//! Pass 1 builds a luma histogram. The histogram is smoothed and split into
//! peaks; the brightest heavy peak is taken as paper and the darkest
//! prominent peak as ink. Pass 2 stretches the range between them.
//!
//! ```text
//! white score = (v / 255)³ × mass score
//! mass score  = 1 + ln(mass / 0.1)   if mass ≥ 0.1
//!             = mass / 0.1           otherwise
//! black score = (1 − v / 255)³ × (ln(1 + height) − ln(1 + lower valley))
//! ```

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::buffer::{PixelBuffer, PixelBufferMut};
use crate::error::Result;
use crate::ops::{Partitioner, apply_lut, scan_rows};

const GAMMA: f64 = 2.2;
const LINEAR_STEPS: usize = 4096;
/// Share of a peak's outer-side mass skipped when placing the point.
const EDGE_PERCENTILE: f64 = 0.2;
const MASS_KNEE: f64 = 0.1;
/// Widening of the retain-color bounds, as a share of the span.
const RETAIN_COLOR_MARGIN: f64 = 0.1;

/// 8-bit value → linear light in `0..LINEAR_STEPS`.
static TO_LINEAR: LazyLock<[u16; 256]> = LazyLock::new(|| {
    std::array::from_fn(|v| {
        ((v as f64 / 255.0).powf(GAMMA) * (LINEAR_STEPS - 1) as f64).round() as u16
    })
});

/// Linear light → 8-bit value.
static TO_GAMMA: LazyLock<Vec<u8>> = LazyLock::new(|| {
    (0..LINEAR_STEPS)
        .map(|i| {
            ((i as f64 / (LINEAR_STEPS - 1) as f64).powf(1.0 / GAMMA) * 255.0).round() as u8
        })
        .collect()
});

/// How the stretch is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LevelsMode {
    /// Clamp to the points and rescale in linear light. Best for text pages.
    #[default]
    Flatten,
    /// Rescale raw values linearly between slightly widened points, keeping
    /// color relationships. Best for photos.
    RetainColor,
}

/// One local maximum of the smoothed histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub value: usize,
    /// Inclusive valley indices on either side.
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub left_bottom: f64,
    pub right_bottom: f64,
    /// Share of all pixels between the two valleys.
    pub mass: f64,
}

impl Peak {
    fn white_score(&self) -> f64 {
        let v_score = (self.value as f64 / 255.0).powi(3);
        let m_score = if self.mass >= MASS_KNEE {
            1.0 + (self.mass / MASS_KNEE).ln()
        } else {
            self.mass / MASS_KNEE
        };
        v_score * m_score
    }

    fn black_score(&self) -> f64 {
        let v_score = (1.0 - self.value as f64 / 255.0).powi(3);
        let bottom = self.left_bottom.min(self.right_bottom);
        v_score * ((1.0 + self.height).ln() - (1.0 + bottom).ln())
    }
}

/// Chosen black and white points, `black < white`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteBlackPoints {
    pub black: u8,
    pub white: u8,
}

/// Result of [`correct_white_black`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelsOutcome {
    Applied(WhiteBlackPoints),
    /// No usable peaks; the buffer was left untouched.
    Skipped,
}

/// Pass 1: 256-bucket luma histogram of the whole buffer.
pub fn luma_histogram(parts: &Partitioner, src: &PixelBuffer<'_>) -> Result<[u64; 256]> {
    let layout = *src.layout();
    scan_rows(
        parts,
        src,
        [0u64; 256],
        |src, rows| {
            let mut hist = [0u64; 256];
            for y in rows {
                let row = src.row(y);
                for x in 0..layout.width() {
                    hist[layout.luma_at(row, x) as usize] += 1;
                }
            }
            Ok(hist)
        },
        |acc, partial| {
            for (a, p) in acc.iter_mut().zip(partial) {
                *a += p;
            }
        },
    )
}

/// Pass 1 plus peak analysis: locate the black and white points of `src`.
///
/// Returns `None` when no peaks are found or the best white peak is not
/// brighter than the best black peak.
pub fn find_white_black(
    parts: &Partitioner,
    src: &PixelBuffer<'_>,
) -> Result<Option<WhiteBlackPoints>> {
    let hist = luma_histogram(parts, src)?;
    Ok(points_from_histogram(&hist))
}

/// Both passes over `buf`, in place. 1-bit buffers are always skipped.
pub fn correct_white_black(
    parts: &Partitioner,
    buf: &mut PixelBufferMut<'_>,
    mode: LevelsMode,
) -> Result<LevelsOutcome> {
    if buf.layout().is_bit_packed() {
        debug!("white/black point skipped for 1-bit buffer");
        return Ok(LevelsOutcome::Skipped);
    }
    let Some(points) = find_white_black(parts, &buf.as_buffer())? else {
        return Ok(LevelsOutcome::Skipped);
    };
    let Some(lut) = levels_lut(points, mode) else {
        warn!(black = points.black, white = points.white, "white/black points collapse in linear light");
        return Ok(LevelsOutcome::Skipped);
    };
    debug!(black = points.black, white = points.white, ?mode, "white/black point");
    apply_lut(parts, buf, &lut, "white/black point")?;
    Ok(LevelsOutcome::Applied(points))
}

pub(crate) fn points_from_histogram(hist: &[u64; 256]) -> Option<WhiteBlackPoints> {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return None;
    }
    let smooth = smooth(hist);
    let peaks = find_peaks(&smooth, hist, total);

    let white = peaks
        .iter()
        .max_by(|a, b| a.white_score().total_cmp(&b.white_score()));
    let black = peaks
        .iter()
        .max_by(|a, b| a.black_score().total_cmp(&b.black_score()));
    let (Some(white), Some(black)) = (white, black) else {
        warn!("white/black point skipped: no histogram peaks");
        return None;
    };
    if white.value <= black.value {
        warn!(
            white = white.value,
            black = black.value,
            "white/black point skipped: white peak is not above black peak"
        );
        return None;
    }

    // Walk inwards from each outer edge through 20% of that side's mass.
    let white_side: u64 = hist[white.value..=white.right].iter().sum();
    let white_limit = white_side as f64 * EDGE_PERCENTILE;
    let mut acc = 0u64;
    let mut white_point = white.right;
    while white_point > white.value {
        acc += hist[white_point];
        if acc as f64 >= white_limit {
            break;
        }
        white_point -= 1;
    }

    let black_side: u64 = hist[black.left..=black.value].iter().sum();
    let black_limit = black_side as f64 * EDGE_PERCENTILE;
    let mut acc = 0u64;
    let mut black_point = black.left;
    while black_point < black.value {
        acc += hist[black_point];
        if acc as f64 >= black_limit {
            break;
        }
        black_point += 1;
    }

    if white_point <= black_point {
        warn!(white_point, black_point, "white/black point skipped: empty range");
        return None;
    }
    Some(WhiteBlackPoints {
        black: black_point as u8,
        white: white_point as u8,
    })
}

/// 5-tap box filter, averaging only the taps inside the histogram.
fn smooth(hist: &[u64; 256]) -> [f64; 256] {
    std::array::from_fn(|i| {
        let lo = i.saturating_sub(2);
        let hi = (i + 2).min(255);
        let sum: u64 = hist[lo..=hi].iter().sum();
        sum as f64 / (hi - lo + 1) as f64
    })
}

/// Local maxima of `smooth`.
///
/// A candidate `i` must be strictly above `i − 1` and at least as high as
/// `i + 3` and `i + 4`; neighbors past either end are ignored.
pub fn find_peaks(smooth: &[f64; 256], hist: &[u64; 256], total: u64) -> Vec<Peak> {
    let mut peaks = Vec::new();
    for i in 0..256 {
        let h = smooth[i];
        if h <= 0.0 {
            continue;
        }
        if i >= 1 && smooth[i - 1] >= h {
            continue;
        }
        if [3, 4].iter().any(|&d| i + d < 256 && smooth[i + d] > h) {
            continue;
        }

        let mut left = i;
        while left > 0 && smooth[left - 1] <= smooth[left] {
            left -= 1;
        }
        let mut right = i;
        while right < 255 && smooth[right + 1] <= smooth[right] {
            right += 1;
        }
        let mass: u64 = hist[left..=right].iter().sum();
        peaks.push(Peak {
            value: i,
            left,
            right,
            height: h,
            left_bottom: smooth[left],
            right_bottom: smooth[right],
            mass: mass as f64 / total as f64,
        });
    }
    peaks
}

/// Lookup table for `mode`, or `None` when the points leave nothing to stretch.
fn levels_lut(points: WhiteBlackPoints, mode: LevelsMode) -> Option<[u8; 256]> {
    match mode {
        LevelsMode::Flatten => flatten_lut(points),
        LevelsMode::RetainColor => Some(retain_color_lut(points)),
    }
}

/// `None` when both points map to the same linear value (values 0..=4 all
/// land on 0).
fn flatten_lut(points: WhiteBlackPoints) -> Option<[u8; 256]> {
    let lin = &*TO_LINEAR;
    let gamma = &*TO_GAMMA;
    let lo = lin[points.black as usize] as f64;
    let hi = lin[points.white as usize] as f64;
    if hi <= lo {
        return None;
    }
    let max = (LINEAR_STEPS - 1) as f64;
    Some(std::array::from_fn(|v| {
        let clamped = v.clamp(points.black as usize, points.white as usize);
        let scaled = (lin[clamped] as f64 - lo) / (hi - lo) * max;
        gamma[scaled.round().clamp(0.0, max) as usize]
    }))
}

fn retain_color_lut(points: WhiteBlackPoints) -> [u8; 256] {
    let span = (points.white - points.black) as f64;
    let lo = (points.black as f64 - span * RETAIN_COLOR_MARGIN).max(0.0);
    let hi = (points.white as f64 + span * RETAIN_COLOR_MARGIN).min(255.0);
    std::array::from_fn(|v| ((v as f64 - lo) * 255.0 / (hi - lo)).round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{PixelEncoding, PixelImage, PixelLayout};
    use crate::ops::LockMode;

    /// Mostly light-gray paper with a band of dark-gray ink.
    fn dull_page() -> PixelImage {
        let layout = PixelLayout::new(50, 40, PixelEncoding::Gray8);
        let data = (0..layout.required_len())
            .map(|i| {
                let (x, y) = (i % 50, i / 50);
                let base: i32 = if (10..16).contains(&y) { 60 } else { 200 };
                (base + ((x * 7 + y * 3) % 9) as i32 - 4) as u8
            })
            .collect();
        PixelImage::from_raw(data, layout).unwrap()
    }

    #[test]
    fn test_gamma_tables_are_monotonic_and_invertible() {
        assert_eq!(TO_LINEAR[0], 0);
        assert_eq!(TO_LINEAR[255], 4095);
        assert!(TO_LINEAR.windows(2).all(|w| w[0] <= w[1]));
        for v in [0usize, 17, 128, 200, 255] {
            assert_eq!(TO_GAMMA[TO_LINEAR[v] as usize] as usize, v);
        }
    }

    #[test]
    fn test_peak_window_is_asymmetric() {
        let mut smooth = [0.0; 256];
        smooth[100] = 5.0;
        smooth[103] = 6.0;
        let hist = [1u64; 256];
        let peaks = find_peaks(&smooth, &hist, 256);
        let values: Vec<usize> = peaks.iter().map(|p| p.value).collect();
        // 100 loses to +3; 103 is a peak.
        assert_eq!(values, vec![103]);

        // Two below is not part of the window.
        let mut smooth = [0.0; 256];
        smooth[98] = 9.0;
        smooth[100] = 5.0;
        let values: Vec<usize> = find_peaks(&smooth, &hist, 256).iter().map(|p| p.value).collect();
        assert_eq!(values, vec![98, 100]);
    }

    #[test]
    fn test_peak_bounds_follow_valleys() {
        let mut smooth = [0.0; 256];
        for (i, v) in [1.0, 3.0, 6.0, 3.0, 1.0].into_iter().enumerate() {
            smooth[50 + i] = v;
        }
        let mut hist = [0u64; 256];
        hist[52] = 10;
        let peaks = find_peaks(&smooth, &hist, 10);
        // 51 only has to beat 50, 54 and 55.
        let values: Vec<usize> = peaks.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![51, 52]);
        let p = peaks[1];
        assert_eq!((p.value, p.left, p.right), (52, 0, 255));
        assert_eq!(p.mass, 1.0);
        assert_eq!(p.left_bottom, 0.0);
    }

    #[test]
    fn test_points_from_two_peak_histogram() {
        let mut hist = [0u64; 256];
        for v in 195..=205 {
            hist[v] = 800;
        }
        for v in 55..=65 {
            hist[v] = 100;
        }
        let points = points_from_histogram(&hist).unwrap();
        assert!((55..=70).contains(&points.black), "black {}", points.black);
        assert!((190..=205).contains(&points.white), "white {}", points.white);
    }

    #[test]
    fn test_uniform_page_is_skipped() {
        let mut hist = [0u64; 256];
        hist[128] = 1000;
        assert_eq!(points_from_histogram(&hist), None);
        assert_eq!(points_from_histogram(&[0; 256]), None);
    }

    #[test]
    fn test_flatten_stretches_paper_to_white() {
        let mut img = dull_page();
        let outcome = correct_white_black(
            &Partitioner::new(4, 1),
            &mut img.lock_mut(LockMode::ReadWrite),
            LevelsMode::Flatten,
        )
        .unwrap();
        let LevelsOutcome::Applied(points) = outcome else {
            panic!("expected correction, got {outcome:?}");
        };
        assert!(points.black < points.white);
        let buf = img.lock();
        assert!(buf.luma(0, 0) > 230, "paper {}", buf.luma(0, 0));
        assert!(buf.luma(0, 12) < 30, "ink {}", buf.luma(0, 12));
    }

    #[test]
    fn test_retain_color_keeps_headroom() {
        let lut = retain_color_lut(WhiteBlackPoints { black: 50, white: 150 });
        // Bounds widen to [40, 160].
        assert_eq!(lut[40], 0);
        assert_eq!(lut[160], 255);
        assert!(lut[50] > 0 && lut[150] < 255);
    }

    #[test]
    fn test_flatten_lut_clamps_outside_points() {
        let lut = flatten_lut(WhiteBlackPoints { black: 40, white: 210 }).unwrap();
        assert_eq!(lut[0], 0);
        assert_eq!(lut[40], 0);
        assert_eq!(lut[210], 255);
        assert_eq!(lut[255], 255);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_near_black_points_have_no_flatten_lut() {
        let points = WhiteBlackPoints { black: 1, white: 4 };
        assert_eq!(TO_LINEAR[1], TO_LINEAR[4]);
        assert!(flatten_lut(points).is_none());
        assert!(levels_lut(points, LevelsMode::Flatten).is_none());
        let lut = levels_lut(points, LevelsMode::RetainColor).unwrap();
        assert!(lut[4] > lut[1]);
    }

    #[test]
    fn test_bitonal_buffer_is_skipped() {
        let mut img = PixelImage::new(16, 16, PixelEncoding::Bit).unwrap();
        let outcome = correct_white_black(
            &Partitioner::single(),
            &mut img.lock_mut(LockMode::ReadWrite),
            LevelsMode::Flatten,
        )
        .unwrap();
        assert_eq!(outcome, LevelsOutcome::Skipped);
    }
}
