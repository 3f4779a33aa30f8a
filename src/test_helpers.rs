//! Shared test utilities for the imageme test suite.
//!
//! Fixture builders that lay out small galleries in a temp directory, plus
//! string helpers for asserting on rendered pages.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_scenario();
//! crawl(tmp.path(), &renderer, RenderMode::Fast, None).unwrap();
//!
//! let page = read_page(tmp.path());
//! assert_eq!(count(&page, "<td>"), 2);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::config::GalleryConfig;

// =========================================================================
// Fixture setup
// =========================================================================

/// Lay out the reference gallery:
///
/// ```text
/// a.png  b.jpg  c.txt
/// sub/d.gif
/// ```
///
/// Images are real (tiny) files so both the fast and the enhanced pass can
/// run over the tree.
pub fn setup_scenario() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write_image(&root.join("a.png"), 12, 8);
    write_image(&root.join("b.jpg"), 10, 10);
    write_text(&root.join("c.txt"), "not an image");
    std::fs::create_dir(root.join("sub")).unwrap();
    write_image(&root.join("sub/d.gif"), 6, 6);
    tmp
}

/// Write a solid-color image. The format follows the file extension.
pub fn write_image(path: &Path, width: u32, height: u32) {
    let pixels = image::RgbImage::from_pixel(width, height, image::Rgb([200, 80, 40]));
    pixels
        .save(path)
        .unwrap_or_else(|e| panic!("could not write test image {}: {e}", path.display()));
}

pub fn write_text(path: &Path, contents: &str) {
    std::fs::write(path, contents)
        .unwrap_or_else(|e| panic!("could not write {}: {e}", path.display()));
}

// =========================================================================
// Page assertions
// =========================================================================

/// Read the index page generated for `dir`. Panics if there is none.
pub fn read_page(dir: &Path) -> String {
    let page = dir.join(GalleryConfig::default().index_filename);
    std::fs::read_to_string(&page)
        .unwrap_or_else(|e| panic!("no page at {}: {e}", page.display()))
}

/// Non-overlapping occurrences of `needle` in `haystack`.
pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
