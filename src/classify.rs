//! Image file classification by extension.
//!
//! A file is an image when its extension, compared case-insensitively, is one
//! of [`IMAGE_EXTENSIONS`]. Classification never opens the file; the codec
//! decides later whether the bytes are actually decodable.

use std::path::Path;

/// Extensions of files shown in the gallery.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "gif", "bmp"];

/// Extensions browsers cannot display directly.
const NON_RENDERABLE_EXTENSIONS: &[&str] = &["tif", "tiff"];

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// Whether a bare file name denotes a supported image format.
///
/// Names without an extension (including dot-files such as `.png`) are
/// rejected.
pub fn is_image_filename(filename: &str) -> bool {
    extension_of(filename).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether a path is a regular file with a supported image extension.
///
/// Directories never match, whatever their name.
pub fn is_image(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    path.file_name()
        .map(|name| is_image_filename(&name.to_string_lossy()))
        .unwrap_or(false)
}

/// Whether a browser can display the image format named by `filename`
/// without conversion.
pub fn is_browser_renderable(filename: &str) -> bool {
    extension_of(filename).is_none_or(|ext| !NON_RENDERABLE_EXTENSIONS.contains(&ext.as_str()))
}
