//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, GIF, BMP, TIFF) | `image::ImageReader` with content sniffing |
//! | Resize | `image::DynamicImage::resize_exact` with `Nearest` filter |
//! | Encode | `image::DynamicImage::write_to` into an in-memory buffer |
//!
//! Nearest-neighbour resampling is used because thumbnails are produced every
//! time a page is rendered; throughput matters more than quality here.

use super::backend::{BackendError, DecodedImage, ImageBackend, InlineFormat, SourceFormat};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Formats whose decoders must be compiled in for the backend to be usable.
const REQUIRED_DECODERS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

/// Backend built on the `image` crate.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }

    /// Whether every gallery format can be decoded by this build.
    pub fn decoders_available() -> bool {
        REQUIRED_DECODERS.iter().all(|fmt| fmt.reading_enabled())
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn source_format(format: Option<ImageFormat>) -> SourceFormat {
    match format {
        Some(ImageFormat::Png) => SourceFormat::Png,
        Some(ImageFormat::Jpeg) => SourceFormat::Jpeg,
        Some(ImageFormat::Gif) => SourceFormat::Gif,
        Some(ImageFormat::Bmp) => SourceFormat::Bmp,
        Some(ImageFormat::Tiff) => SourceFormat::Tiff,
        _ => SourceFormat::Other,
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<DecodedImage, BackendError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = source_format(reader.format());
        let pixels = reader.decode().map_err(|e| {
            BackendError::Decode(format!("Failed to decode {}: {}", path.display(), e))
        })?;
        Ok(DecodedImage { pixels, format })
    }

    fn resize(
        &self,
        image: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<DecodedImage, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Invalid target size {width}x{height}"
            )));
        }
        Ok(DecodedImage {
            pixels: image.pixels.resize_exact(width, height, FilterType::Nearest),
            format: image.format,
        })
    }

    fn encode(&self, image: &DecodedImage, format: InlineFormat) -> Result<Vec<u8>, BackendError> {
        // JPEG has no alpha channel; the other encoders all take RGBA8.
        let (pixels, image_format) = match format {
            InlineFormat::Jpeg => (
                DynamicImage::ImageRgb8(image.pixels.to_rgb8()),
                ImageFormat::Jpeg,
            ),
            InlineFormat::Png => (
                DynamicImage::ImageRgba8(image.pixels.to_rgba8()),
                ImageFormat::Png,
            ),
            InlineFormat::Gif => (
                DynamicImage::ImageRgba8(image.pixels.to_rgba8()),
                ImageFormat::Gif,
            ),
            InlineFormat::Bmp => (
                DynamicImage::ImageRgba8(image.pixels.to_rgba8()),
                ImageFormat::Bmp,
            ),
        };

        let mut buffer = Cursor::new(Vec::new());
        pixels
            .write_to(&mut buffer, image_format)
            .map_err(|e| BackendError::Encode(format!("{image_format:?} encode failed: {e}")))?;
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::Dimensions;
    use crate::test_helpers::{write_image, write_text};
    use tempfile::TempDir;

    #[test]
    fn all_gallery_decoders_are_compiled_in() {
        assert!(RustBackend::decoders_available());
    }

    #[test]
    fn decode_detects_format_and_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.png");
        write_image(&path, 40, 30);

        let image = RustBackend::new().decode(&path).unwrap();
        assert_eq!(image.format, SourceFormat::Png);
        assert_eq!(
            image.dimensions(),
            Dimensions {
                width: 40,
                height: 30
            }
        );
    }

    #[test]
    fn decode_sniffs_content_not_extension() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real.jpg");
        write_image(&real, 16, 16);
        let misnamed = tmp.path().join("misnamed.png");
        std::fs::copy(&real, &misnamed).unwrap();

        let image = RustBackend::new().decode(&misnamed).unwrap();
        assert_eq!(image.format, SourceFormat::Jpeg);
    }

    #[test]
    fn decode_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        write_text(&path, "definitely not a png");

        let err = RustBackend::new().decode(&path).unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[test]
    fn decode_missing_file_is_io_error() {
        let err = RustBackend::new()
            .decode(Path::new("/nonexistent/nowhere.png"))
            .unwrap_err();
        assert!(matches!(err, BackendError::Io(_)));
    }

    #[test]
    fn resize_produces_exact_dimensions() {
        let backend = RustBackend::new();
        let image = DecodedImage {
            pixels: DynamicImage::new_rgb8(300, 200),
            format: SourceFormat::Jpeg,
        };
        let resized = backend.resize(&image, 90, 60).unwrap();
        assert_eq!(
            resized.dimensions(),
            Dimensions {
                width: 90,
                height: 60
            }
        );
        assert_eq!(resized.format, SourceFormat::Jpeg);
    }

    #[test]
    fn resize_rejects_zero_size() {
        let image = DecodedImage {
            pixels: DynamicImage::new_rgb8(10, 10),
            format: SourceFormat::Png,
        };
        assert!(RustBackend::new().resize(&image, 0, 10).is_err());
    }

    #[test]
    fn encode_writes_format_signatures() {
        let backend = RustBackend::new();
        let image = DecodedImage {
            pixels: DynamicImage::new_rgba8(8, 8),
            format: SourceFormat::Png,
        };

        let png = backend.encode(&image, InlineFormat::Png).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));

        let jpeg = backend.encode(&image, InlineFormat::Jpeg).unwrap();
        assert!(jpeg.starts_with(&[0xFF, 0xD8]));

        let gif = backend.encode(&image, InlineFormat::Gif).unwrap();
        assert!(gif.starts_with(b"GIF8"));

        let bmp = backend.encode(&image, InlineFormat::Bmp).unwrap();
        assert!(bmp.starts_with(b"BM"));
    }
}
