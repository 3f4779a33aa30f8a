//! Image processing for the enhanced pass, in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (content-sniffed) |
//! | **Thumbnail** | `resize_exact` with nearest-neighbour filter |
//! | **Inline encoding** | `image` encoders + `base64` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Codec**: [`Codec`], the Available/Unavailable capability the page
//!   renderer depends on

pub mod backend;
mod calculations;
pub mod codec;
pub mod rust_backend;

pub use backend::{
    BackendError, DecodedImage, Dimensions, ImageBackend, InlineFormat, SourceFormat,
};
pub use calculations::{buffer_size, calculate_thumbnail_dimensions};
pub use codec::{CellSources, Codec, CodecError, InlineImage};
pub use rust_backend::RustBackend;
