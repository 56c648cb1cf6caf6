//! Scanpix Core — pixel-buffer engine for scanned pages.
//!
//! This crate converts between pixel encodings, applies tone and color
//! corrections, and analyses page content (blank pages, skew, white/black
//! points, sensor-column calibration). It works on caller-owned memory
//! through scoped buffer views. No file, device or UI dependencies.

pub mod analysis;
pub mod buffer;
pub mod config;
pub mod correction;
pub mod engine;
pub mod error;
pub mod ops;
pub mod rotate;
pub mod skew;

// Re-exports for convenience.
pub use analysis::{BlankReport, ColumnCalibration, LevelsMode, LevelsOutcome, LogicalPixelFormat};
pub use buffer::{Channel, ChannelOffsets, PixelBuffer, PixelBufferMut, PixelEncoding, PixelImage, PixelLayout};
pub use config::EngineConfig;
pub use correction::{CorrectionMode, Corrected};
pub use engine::Engine;
pub use error::{Result, ScanpixError};
pub use ops::{CopyOptions, LockMode, Partitioner};
pub use skew::HoughLine;
