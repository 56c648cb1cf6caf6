//! Configured entry point bundling every operation.
//!
//! [`Engine`] owns the [`EngineConfig`] and the [`Partitioner`] derived from
//! it, so callers don't thread partition settings and default thresholds
//! through each call. The free functions in [`crate::ops`],
//! [`crate::analysis`] and friends remain usable on their own.

use tracing::instrument;

use crate::analysis::{
    self, BlankReport, ColumnCalibration, LevelsMode, LevelsOutcome, LogicalPixelFormat,
};
use crate::buffer::{PixelBuffer, PixelBufferMut, PixelEncoding, PixelImage, PixelLayout};
use crate::config::{BlankDetectionConfig, EngineConfig};
use crate::correction::{self, CorrectionMode, Corrected};
use crate::error::Result;
use crate::ops::{self, CopyOptions, LockMode, Partitioner};
use crate::{rotate, skew};

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
    parts: Partitioner,
}

impl Engine {
    /// Build an engine from a validated config.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let parts = Partitioner::from_config(&config.partition);
        Ok(Self { config, parts })
    }

    /// Parse a JSON config and build an engine from it.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(EngineConfig::from_json(json)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.parts
    }

    // ------------------------------------------------------------------------
    // Conversion
    // ------------------------------------------------------------------------

    /// Copy or convert `src` into `dst`. When `opts` carries no
    /// `black_white_threshold` the configured default is used.
    #[instrument(skip_all, fields(from = %src.layout().encoding(), to = %dst.layout().encoding()))]
    pub fn copy(&self, src: &PixelBuffer<'_>, dst: &mut PixelBufferMut<'_>, opts: &CopyOptions) -> Result<()> {
        let opts = CopyOptions {
            black_white_threshold: opts
                .black_white_threshold
                .or(Some(self.config.copy.black_white_threshold)),
            ..*opts
        };
        ops::copy_pixels(&self.parts, src, dst, &opts)
    }

    /// New image holding `image` in `encoding`.
    #[instrument(skip_all, fields(from = %image.encoding(), to = %encoding))]
    pub fn convert(&self, image: &PixelImage, encoding: PixelEncoding) -> Result<PixelImage> {
        let mut out = PixelImage::new(image.width(), image.height(), encoding)?;
        self.copy(&image.lock(), &mut out.lock_mut(LockMode::WriteOnly), &CopyOptions::default())?;
        Ok(out)
    }

    /// New image holding the `width × height` window of `image` at `(x, y)`.
    #[instrument(skip(self, image), fields(source_width = image.width(), source_height = image.height()))]
    pub fn crop(&self, image: &PixelImage, x: usize, y: usize, width: usize, height: usize) -> Result<PixelImage> {
        let layout = PixelLayout::new(width, height, image.encoding()).with_offsets(image.layout().offsets());
        let mut out = PixelImage::with_layout(layout)?;
        self.copy(
            &image.lock(),
            &mut out.lock_mut(LockMode::WriteOnly),
            &CopyOptions::window(x, y, width, height),
        )?;
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Tone and color
    // ------------------------------------------------------------------------

    #[instrument(skip(self, buf), fields(width = buf.width(), height = buf.height()))]
    pub fn brightness(&self, buf: &mut PixelBufferMut<'_>, amount: f32) -> Result<()> {
        ops::brightness(&self.parts, buf, amount)
    }

    #[instrument(skip(self, buf), fields(width = buf.width(), height = buf.height()))]
    pub fn contrast(&self, buf: &mut PixelBufferMut<'_>, amount: f32) -> Result<()> {
        ops::contrast(&self.parts, buf, amount)
    }

    #[instrument(skip(self, buf), fields(width = buf.width(), height = buf.height()))]
    pub fn hue_shift(&self, buf: &mut PixelBufferMut<'_>, amount: f32) -> Result<()> {
        ops::hue_shift(&self.parts, buf, amount)
    }

    #[instrument(skip(self, buf), fields(width = buf.width(), height = buf.height()))]
    pub fn saturation(&self, buf: &mut PixelBufferMut<'_>, amount: f32) -> Result<()> {
        ops::saturation(&self.parts, buf, amount)
    }

    #[instrument(skip(self, src, dst), fields(width = src.width(), height = src.height()))]
    pub fn sharpen(&self, src: &PixelBuffer<'_>, dst: &mut PixelBufferMut<'_>, amount: f32) -> Result<()> {
        ops::sharpen(&self.parts, src, dst, amount)
    }

    #[instrument(skip_all, fields(width = src.width(), height = src.height()))]
    pub fn bilateral(&self, src: &PixelBuffer<'_>, dst: &mut PixelBufferMut<'_>) -> Result<()> {
        ops::bilateral(&self.parts, src, dst)
    }

    #[instrument(skip(self, buf), fields(width = buf.width(), height = buf.height()))]
    pub fn fill(&self, buf: &mut PixelBufferMut<'_>, color: [u8; 4]) -> Result<()> {
        ops::fill(&self.parts, buf, color)
    }

    #[instrument(skip_all, fields(width = buf.width(), height = buf.height()))]
    pub fn unmultiply_alpha(&self, buf: &mut PixelBufferMut<'_>) -> Result<()> {
        ops::unmultiply_alpha(&self.parts, buf)
    }

    // ------------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------------

    /// Blank-page check with the configured thresholds.
    #[instrument(skip_all, fields(width = src.width(), height = src.height()))]
    pub fn detect_blank(&self, src: &PixelBuffer<'_>) -> Result<BlankReport> {
        analysis::detect_blank(&self.parts, src, &self.config.blank)
    }

    /// Blank-page check with explicit thresholds.
    #[instrument(skip(self, src), fields(width = src.width(), height = src.height()))]
    pub fn detect_blank_with(&self, src: &PixelBuffer<'_>, thresholds: &BlankDetectionConfig) -> Result<BlankReport> {
        analysis::detect_blank(&self.parts, src, thresholds)
    }

    #[instrument(skip_all, fields(width = src.width(), height = src.height()))]
    pub fn logical_format(&self, src: &PixelBuffer<'_>) -> Result<LogicalPixelFormat> {
        analysis::logical_format(&self.parts, src)
    }

    #[instrument(skip(self, buf), fields(width = buf.width(), height = buf.height()))]
    pub fn correct_white_black(&self, buf: &mut PixelBufferMut<'_>, mode: LevelsMode) -> Result<LevelsOutcome> {
        analysis::correct_white_black(&self.parts, buf, mode)
    }

    #[instrument(skip_all, fields(width = buf.width(), height = buf.height()))]
    pub fn calibrate_columns(&self, buf: &mut PixelBufferMut<'_>) -> Result<ColumnCalibration> {
        analysis::calibrate_columns(&self.parts, buf)
    }

    #[instrument(skip_all, fields(width = left.width(), height = left.height()))]
    pub fn rmse(&self, left: &PixelBuffer<'_>, right: &PixelBuffer<'_>) -> Result<f64> {
        analysis::rmse(&self.parts, left, right)
    }

    /// Skew angle in degrees; see [`skew::detect_skew`].
    #[instrument(skip_all, fields(width = src.width(), height = src.height()))]
    pub fn detect_skew(&self, src: &PixelBuffer<'_>) -> f64 {
        skew::detect_skew(src)
    }

    // ------------------------------------------------------------------------
    // Geometry and pipelines
    // ------------------------------------------------------------------------

    #[instrument(skip(self, src, dst), fields(width = src.width(), height = src.height()))]
    pub fn rotate_quarter(&self, src: &PixelBuffer<'_>, dst: &mut PixelBufferMut<'_>, turns: i32) -> Result<()> {
        rotate::rotate_quarter(&self.parts, src, dst, turns)
    }

    /// New image holding `image` turned clockwise by `turns` quarter turns.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn rotate_image(&self, image: &PixelImage, turns: i32) -> Result<PixelImage> {
        let (w, h) = if turns.rem_euclid(2) == 1 {
            (image.height(), image.width())
        } else {
            (image.width(), image.height())
        };
        let layout = PixelLayout::new(w, h, image.encoding()).with_offsets(image.layout().offsets());
        let mut out = PixelImage::with_layout(layout)?;
        self.rotate_quarter(&image.lock(), &mut out.lock_mut(LockMode::WriteOnly), turns)?;
        Ok(out)
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn auto_correct(&self, image: &PixelImage, mode: CorrectionMode) -> Result<Corrected> {
        correction::auto_correct(&self.parts, image, mode)
    }
}
