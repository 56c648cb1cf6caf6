//! Hue rotation and saturation scaling.
//!
//! Both only make sense for color buffers; on gray and 1-bit buffers they
//! succeed without touching memory.

use palette::{FromColor, Hsl, Srgb};
use tracing::debug;

use super::{Partitioner, map_rows};
use crate::buffer::PixelBufferMut;
use crate::error::{Result, check_range};

/// Rotate every pixel's hue by `-3 × amount` HSV sextants (`amount` in [-1, 1],
/// so ±1 is a half turn). Gray pixels (`max == min`) keep their value.
pub fn hue_shift(parts: &Partitioner, buf: &mut PixelBufferMut<'_>, amount: f32) -> Result<()> {
    check_range("hue", amount as f64, -1.0, 1.0, "[-1, 1]")?;
    let layout = *buf.layout();
    if !layout.is_color() || amount == 0.0 {
        debug!(encoding = %layout.encoding(), amount, "hue shift skipped");
        return Ok(());
    }
    let shift = -3.0 * amount;
    debug!(amount, shift, "hue shift");
    map_rows(parts, buf, |band| {
        for y in band.rows() {
            let row = band.row_mut(y);
            for x in 0..layout.width() {
                let rgb = layout.rgb_at(row, x);
                layout.put_rgb(row, x, rotate_hue(rgb, shift));
            }
        }
        Ok(())
    })
}

/// Scale every pixel's HSL saturation by `amount + 1` (`amount` in [-1, 1]),
/// capped at full saturation. `-1` produces gray.
pub fn saturation(parts: &Partitioner, buf: &mut PixelBufferMut<'_>, amount: f32) -> Result<()> {
    check_range("saturation", amount as f64, -1.0, 1.0, "[-1, 1]")?;
    let layout = *buf.layout();
    if !layout.is_color() || amount == 0.0 {
        debug!(encoding = %layout.encoding(), amount, "saturation skipped");
        return Ok(());
    }
    let factor = amount + 1.0;
    debug!(amount, factor, "saturation");
    map_rows(parts, buf, |band| {
        for y in band.rows() {
            let row = band.row_mut(y);
            for x in 0..layout.width() {
                let rgb = layout.rgb_at(row, x);
                layout.put_rgb(row, x, scale_saturation(rgb, factor));
            }
        }
        Ok(())
    })
}

/// HSV hue rotation in sextants, with integer max/min and truncating
/// conversion back to bytes.
fn rotate_hue([r, g, b]: [u8; 3], shift: f32) -> [u8; 3] {
    let (ri, gi, bi) = (r as i32, g as i32, b as i32);
    let max = ri.max(gi).max(bi);
    let min = ri.min(gi).min(bi);
    if max == min {
        return [r, g, b];
    }

    let delta = (max - min) as f32;
    let hue = if ri == max {
        (gi - bi) as f32 / delta
    } else if gi == max {
        2.0 + (bi - ri) as f32 / delta
    } else {
        4.0 + (ri - gi) as f32 / delta
    };
    let hue = (hue + shift).rem_euclid(6.0);

    let sat = 1.0 - min as f32 / max as f32;
    let val = max as f32;
    let sector = hue.floor();
    let f = hue - sector;

    let v = val as u8;
    let p = (val * (1.0 - sat)) as u8;
    let q = (val * (1.0 - f * sat)) as u8;
    let t = (val * (1.0 - (1.0 - f) * sat)) as u8;

    match sector as u8 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

fn scale_saturation([r, g, b]: [u8; 3], factor: f32) -> [u8; 3] {
    let rgb = Srgb::new(r, g, b).into_format::<f32>();
    let mut hsl: Hsl = Hsl::from_color(rgb);
    hsl.saturation = (hsl.saturation * factor).min(1.0);
    let out: Srgb = Srgb::from_color(hsl);
    let out: Srgb<u8> = out.into_format();
    [out.red, out.green, out.blue]
}
