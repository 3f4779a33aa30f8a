//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three pixel operations the codec
//! needs: decode, resize, and encode. Everything format-specific (which
//! formats are skipped, which get converted, how bytes are embedded) lives in
//! [`Codec`](super::codec::Codec), so backends stay dumb.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Container format detected while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Other,
}

/// Formats an image can be embedded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl InlineFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            InlineFormat::Png => "image/png",
            InlineFormat::Jpeg => "image/jpeg",
            InlineFormat::Gif => "image/gif",
            InlineFormat::Bmp => "image/bmp",
        }
    }
}

/// A decoded image together with the format it was read from.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: DynamicImage,
    pub format: SourceFormat,
}

impl DecodedImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }
}

/// Trait for image processing backends.
///
/// `Send + Sync` because the enhanced pass runs on a background thread.
pub trait ImageBackend: Send + Sync {
    /// Open and decode an image, sniffing its format from the content.
    fn decode(&self, path: &Path) -> Result<DecodedImage, BackendError>;

    /// Resample to exactly `width` x `height`.
    fn resize(
        &self,
        image: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<DecodedImage, BackendError>;

    /// Serialize to the given format.
    fn encode(&self, image: &DecodedImage, format: InlineFormat) -> Result<Vec<u8>, BackendError>;
}
