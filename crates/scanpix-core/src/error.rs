//! Error type shared by every operation in the engine.

use crate::buffer::PixelEncoding;

#[derive(Debug, thiserror::Error)]
pub enum ScanpixError {
    #[error("invalid pixel layout: {0}")]
    InvalidLayout(String),
    #[error("pixel data too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },
    #[error("dimension mismatch: {left_width}x{left_height} vs {right_width}x{right_height}")]
    DimensionMismatch {
        left_width: usize,
        left_height: usize,
        right_width: usize,
        right_height: usize,
    },
    #[error("{operation} does not support {encoding} pixels")]
    UnsupportedFormat {
        operation: &'static str,
        encoding: PixelEncoding,
    },
    #[error("parameter `{name}` = {value} is outside {range}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        range: &'static str,
    },
    #[error("invalid copy placement: {0}")]
    InvalidOffset(String),
    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScanpixError>;

impl ScanpixError {
    pub(crate) fn unsupported(operation: &'static str, encoding: PixelEncoding) -> Self {
        Self::UnsupportedFormat {
            operation,
            encoding,
        }
    }
}

/// Check that `value` lies within `[min, max]`.
pub(crate) fn check_range(
    name: &'static str,
    value: f64,
    min: f64,
    max: f64,
    range: &'static str,
) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ScanpixError::InvalidParameter { name, value, range })
    }
}
