//! Brightness and contrast.
//!
//! Both are per-channel tone curves, so each invocation builds a 256-entry
//! table once and maps every color byte through it. Alpha is untouched.

use tracing::debug;

use super::{Partitioner, apply_lut};
use crate::buffer::PixelBufferMut;
use crate::error::{Result, check_range};

/// Add `amount × 255` to every color channel, clamped to [0, 255].
///
/// `amount` is in [-1, 1]. Gray and color buffers are supported; 1-bit
/// buffers are rejected.
pub fn brightness(parts: &Partitioner, buf: &mut PixelBufferMut<'_>, amount: f32) -> Result<()> {
    check_range("brightness", amount as f64, -1.0, 1.0, "[-1, 1]")?;
    let offset = (amount as f64 * 255.0).round() as i32;
    debug!(amount, offset, "brightness");
    let lut = build_lut(|v| v as f64 + offset as f64);
    apply_lut(parts, buf, &lut, "brightness")
}

/// Scale every color channel away from or towards mid-gray.
///
/// ```text
/// multiplier = e^(2 × amount)
/// offset     = (1 − multiplier) / 2 × 255
/// out        = clamp(in × multiplier + offset, 0, 255)
/// ```
///
/// `amount = 0` is the identity.
pub fn contrast(parts: &Partitioner, buf: &mut PixelBufferMut<'_>, amount: f32) -> Result<()> {
    check_range("contrast", amount as f64, -1.0, 1.0, "[-1, 1]")?;
    let multiplier = (2.0 * amount as f64).exp();
    let offset = (1.0 - multiplier) / 2.0 * 255.0;
    debug!(amount, multiplier, offset, "contrast");
    let lut = build_lut(|v| v as f64 * multiplier + offset);
    apply_lut(parts, buf, &lut, "contrast")
}

fn build_lut(curve: impl Fn(u8) -> f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, out) in lut.iter_mut().enumerate() {
        *out = curve(i as u8).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
