//! Owned pixel storage and the lock that hands out buffer views.
//!
//! [`PixelImage`] plays the role of the caller's image object: it owns the
//! memory and grants scoped [`PixelBuffer`]/[`PixelBufferMut`] views. The
//! borrow checker provides the lock exclusivity: any number of read locks,
//! or exactly one write lock.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use tracing::trace;

use super::layout::{PixelEncoding, PixelLayout};
use super::view::{PixelBuffer, PixelBufferMut};
use crate::error::Result;
use crate::ops::LockMode;

/// Heap-allocated image in one of the engine's encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    layout: PixelLayout,
    data: Vec<u8>,
}

impl PixelImage {
    /// Zero-filled, tightly packed image.
    pub fn new(width: usize, height: usize, encoding: PixelEncoding) -> Result<Self> {
        Self::with_layout(PixelLayout::new(width, height, encoding))
    }

    /// Zero-filled image with an explicit (validated) layout.
    pub fn with_layout(layout: PixelLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self {
            layout,
            data: vec![0; layout.stride() * layout.height()],
        })
    }

    /// Adopt existing bytes, validating them against `layout`.
    pub fn from_raw(data: Vec<u8>, layout: PixelLayout) -> Result<Self> {
        PixelBuffer::new(&data, layout)?;
        Ok(Self { layout, data })
    }

    /// Blank image with the same geometry and encoding.
    pub fn copy_blank(&self) -> Self {
        Self {
            layout: self.layout,
            data: vec![0; self.data.len()],
        }
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

    pub fn encoding(&self) -> PixelEncoding {
        self.layout.encoding()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Acquire a read-only view.
    pub fn lock(&self) -> PixelBuffer<'_> {
        trace!(mode = ?LockMode::ReadOnly, width = self.width(), height = self.height(), "lock");
        PixelBuffer::trusted(&self.data, self.layout)
    }

    /// Acquire a writable view. `mode` only documents intent; both
    /// `WriteOnly` and `ReadWrite` give exclusive access.
    pub fn lock_mut(&mut self, mode: LockMode) -> PixelBufferMut<'_> {
        trace!(?mode, width = self.width(), height = self.height(), "lock");
        let layout = self.layout;
        PixelBufferMut::trusted(&mut self.data, layout)
    }

    // ------------------------------------------------------------------------
    // `image` crate interop
    // ------------------------------------------------------------------------

    /// Copy a decoded image into engine storage.
    ///
    /// 8-bit gray, RGB and RGBA images keep their encoding; anything else
    /// is converted to RGBA first.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let (encoding, data) = match image {
            DynamicImage::ImageLuma8(gray) => (PixelEncoding::Gray8, gray.as_raw().clone()),
            DynamicImage::ImageRgb8(rgb) => (PixelEncoding::Rgb, rgb.as_raw().clone()),
            DynamicImage::ImageRgba8(rgba) => (PixelEncoding::Rgba, rgba.as_raw().clone()),
            other => (PixelEncoding::Rgba, other.to_rgba8().into_raw()),
        };
        Self::from_raw(data, PixelLayout::new(width, height, encoding))
    }

    /// Export to a `DynamicImage` for encoding. Bitonal data becomes 8-bit gray.
    pub fn to_dynamic(&self) -> DynamicImage {
        let buf = self.lock();
        let layout = *buf.layout();
        let (w, h) = (layout.width() as u32, layout.height() as u32);
        if layout.is_bit_packed() || layout.is_gray() {
            DynamicImage::ImageLuma8(GrayImage::from_fn(w, h, |x, y| {
                image::Luma([buf.luma(x as usize, y as usize)])
            }))
        } else if layout.has_alpha() {
            DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
                let [r, g, b] = buf.rgb(x as usize, y as usize);
                image::Rgba([r, g, b, buf.alpha(x as usize, y as usize)])
            }))
        } else {
            DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
                image::Rgb(buf.rgb(x as usize, y as usize))
            }))
        }
    }
}
