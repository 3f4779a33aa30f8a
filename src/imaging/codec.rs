//! The image codec capability used by the page renderer.
//!
//! [`Codec`] is probed once at startup and injected wherever thumbnails may
//! be produced. It has two variants:
//!
//! - **Available**: backed by an [`ImageBackend`]. Decodes images, produces
//!   width-constrained thumbnails and embeds them as base64 `data:` URIs.
//! - **Unavailable**: every operation reports "unsupported" without touching
//!   the filesystem, and every caller falls back to the original file.
//!
//! Failures never propagate past this module: a broken image costs a warning
//! and a fallback to linking the file directly.

use super::backend::{BackendError, DecodedImage, ImageBackend, InlineFormat, SourceFormat};
use super::calculations::{buffer_size, calculate_thumbnail_dimensions};
use super::rust_backend::RustBackend;
use crate::classify;
use crate::config::ThumbnailConfig;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("image processing is unavailable")]
    Unsupported,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Base64 image data ready to embed in an HTML attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub format: InlineFormat,
    pub base64: String,
}

impl InlineImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.format.mime_type(), self.base64)
    }
}

/// Data URIs for a gallery cell. `None` means "use the original file".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellSources {
    pub link: Option<String>,
    pub src: Option<String>,
}

/// Image processing capability, selected once at startup.
#[derive(Clone)]
pub enum Codec {
    Available(Arc<dyn ImageBackend>),
    Unavailable,
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Available(_) => f.write_str("Codec::Available"),
            Codec::Unavailable => f.write_str("Codec::Unavailable"),
        }
    }
}

/// Largest pixel buffer a thumbnail may allocate: the same ceiling the
/// decoder applies to source images.
fn max_buffer_bytes() -> u64 {
    image::Limits::default().max_alloc.unwrap_or(u64::MAX)
}

/// The format a decoded image is re-encoded to when nothing is forced.
///
/// TIFF does not render in browsers and unknown formats have no encoder, so
/// both become JPEG.
fn natural_inline_format(format: SourceFormat) -> InlineFormat {
    match format {
        SourceFormat::Png => InlineFormat::Png,
        SourceFormat::Jpeg => InlineFormat::Jpeg,
        SourceFormat::Gif => InlineFormat::Gif,
        SourceFormat::Bmp => InlineFormat::Bmp,
        SourceFormat::Tiff | SourceFormat::Other => InlineFormat::Jpeg,
    }
}

impl Codec {
    /// Select the codec variant for this session.
    pub fn probe(config: &ThumbnailConfig) -> Self {
        if !config.enabled {
            tracing::debug!("thumbnails disabled by configuration");
            return Codec::Unavailable;
        }
        if !RustBackend::decoders_available() {
            tracing::warn!("image decoders missing from this build, thumbnails disabled");
            return Codec::Unavailable;
        }
        Codec::Available(Arc::new(RustBackend::new()))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Codec::Available(_))
    }

    /// Open and decode an image.
    pub fn decode(&self, path: &Path) -> Result<DecodedImage, CodecError> {
        let Codec::Available(backend) = self else {
            return Err(CodecError::Unsupported);
        };
        backend.decode(path).map_err(|e| {
            tracing::warn!("could not read image {}: {}", path.display(), e);
            CodecError::Backend(e)
        })
    }

    /// Produce a thumbnail exactly `target_width` pixels wide.
    ///
    /// Returns `None` for GIFs, which are left untouched so animations
    /// survive, for targets whose pixel buffer would exceed the decoder's
    /// allocation limit (very tall strips scaled up to full width), and on any
    /// processing error.
    pub fn thumbnail(&self, image: &DecodedImage, target_width: u32) -> Option<DecodedImage> {
        let Codec::Available(backend) = self else {
            return None;
        };
        if image.format == SourceFormat::Gif {
            return None;
        }
        let target = calculate_thumbnail_dimensions(image.dimensions(), target_width);
        let needed = buffer_size(target, image.pixels.color().bytes_per_pixel());
        if needed > max_buffer_bytes() {
            tracing::warn!(
                "thumbnail of {}x{} would need {} bytes, keeping the original",
                target.width,
                target.height,
                needed
            );
            return None;
        }
        match backend.resize(image, target.width, target.height) {
            Ok(thumb) => Some(thumb),
            Err(e) => {
                tracing::warn!("thumbnail resize failed: {}", e);
                None
            }
        }
    }

    /// Encode an image for embedding in the page.
    ///
    /// `force` overrides the output format; otherwise the source format is
    /// kept where browsers can show it and JPEG is used elsewhere.
    pub fn encode_inline(
        &self,
        image: &DecodedImage,
        force: Option<InlineFormat>,
    ) -> Option<InlineImage> {
        let Codec::Available(backend) = self else {
            return None;
        };
        let format = force.unwrap_or_else(|| natural_inline_format(image.format));
        match backend.encode(image, format) {
            Ok(bytes) => Some(InlineImage {
                format,
                base64: STANDARD.encode(bytes),
            }),
            Err(e) => {
                tracing::warn!("inline encode failed: {}", e);
                None
            }
        }
    }

    /// Inline sources for one gallery cell, decoding the image once.
    ///
    /// `src` is a thumbnail data URI. `link` is set only for formats a
    /// browser cannot show (TIFF), as a full-size JPEG data URI, since a
    /// direct link would only download. A `None` in either field means the
    /// cell uses the original file.
    pub fn cell_sources(&self, dir: &Path, filename: &str, target_width: u32) -> CellSources {
        if !self.is_available() {
            return CellSources::default();
        }
        let Ok(image) = self.decode(&dir.join(filename)) else {
            return CellSources::default();
        };

        let link = if classify::is_browser_renderable(filename) {
            None
        } else {
            self.encode_inline(&image, Some(InlineFormat::Jpeg))
                .map(|inline| inline.data_uri())
        };
        let src = self
            .thumbnail(&image, target_width)
            .and_then(|thumb| self.encode_inline(&thumb, None))
            .map(|inline| inline.data_uri());

        CellSources { link, src }
    }
}
