//! Pixel buffer model: encodings, layouts, borrowed views, owned storage.

pub mod layout;
pub mod owned;
pub mod view;

pub use layout::{Channel, ChannelOffsets, PixelEncoding, PixelLayout, luma, luma_1000};
pub use owned::PixelImage;
pub use view::{PixelBuffer, PixelBufferMut, RowBand};
