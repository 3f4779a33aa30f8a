//! Pure calculation functions for thumbnail dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Calculate thumbnail dimensions for a fixed target width.
///
/// The height follows the source aspect ratio, rounded to the nearest pixel
/// and never below 1.
///
/// # Examples
/// ```
/// # use imageme::imaging::{Dimensions, calculate_thumbnail_dimensions};
/// let source = Dimensions { width: 1600, height: 1200 };
/// assert_eq!(
///     calculate_thumbnail_dimensions(source, 800),
///     Dimensions { width: 800, height: 600 }
/// );
/// ```
pub fn calculate_thumbnail_dimensions(source: Dimensions, target_width: u32) -> Dimensions {
    let scale_ratio = target_width as f64 / source.width.max(1) as f64;
    let height = (scale_ratio * source.height as f64).round() as u32;
    Dimensions {
        width: target_width,
        height: height.max(1),
    }
}

/// Bytes needed to hold a pixel buffer of `dims`.
pub fn buffer_size(dims: Dimensions, bytes_per_pixel: u8) -> u64 {
    u64::from(dims.width) * u64::from(dims.height) * u64::from(bytes_per_pixel)
}
