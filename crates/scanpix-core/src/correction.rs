//! One-call automatic correction of a scanned page.
//!
//! Bitonal content is returned unchanged. Documents get their paper pushed
//! to white and ink to black, then a bilateral pass to flatten paper
//! texture; photos only get a color-preserving levels stretch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{LevelsMode, LevelsOutcome, LogicalPixelFormat, correct_white_black, logical_format};
use crate::buffer::PixelImage;
use crate::error::Result;
use crate::ops::{LockMode, Partitioner, bilateral};

/// What kind of page is being corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CorrectionMode {
    #[default]
    Document,
    Photo,
}

/// Output of [`auto_correct`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corrected {
    pub image: PixelImage,
    pub format: LogicalPixelFormat,
    /// `None` when the page was bitonal and nothing ran.
    pub levels: Option<LevelsOutcome>,
}

/// Correct `image` for `mode`, returning a new image.
pub fn auto_correct(parts: &Partitioner, image: &PixelImage, mode: CorrectionMode) -> Result<Corrected> {
    let format = logical_format(parts, &image.lock())?;
    if format == LogicalPixelFormat::Bitonal {
        debug!("auto correction skipped for bitonal page");
        return Ok(Corrected {
            image: image.clone(),
            format,
            levels: None,
        });
    }

    let mut leveled = image.clone();
    let levels_mode = match mode {
        CorrectionMode::Document => LevelsMode::Flatten,
        CorrectionMode::Photo => LevelsMode::RetainColor,
    };
    let levels = correct_white_black(parts, &mut leveled.lock_mut(LockMode::ReadWrite), levels_mode)?;

    let image = match mode {
        CorrectionMode::Document => {
            let mut smoothed = leveled.copy_blank();
            bilateral(parts, &leveled.lock(), &mut smoothed.lock_mut(LockMode::WriteOnly))?;
            smoothed
        }
        CorrectionMode::Photo => leveled,
    };
    debug!(?mode, ?format, ?levels, "auto correction");
    Ok(Corrected {
        image,
        format,
        levels: Some(levels),
    })
}
