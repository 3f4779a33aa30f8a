//! Gallery page rendering.
//!
//! Renders one self-contained HTML page per directory: a header with the
//! directory path and image count, navigation links (parent first, then
//! subdirectories), and a fixed-column table of images.
//!
//! ## Modes
//!
//! - [`RenderMode::Fast`]: every image cell shows and links the original file.
//!   No image is opened, so a whole tree renders in milliseconds.
//! - [`RenderMode::Enhanced`]: cells show an inline thumbnail and TIFFs link
//!   to an inline full-size JPEG. Anything the codec cannot handle falls back
//!   to the fast-mode cell.
//!
//! ## Writing
//!
//! Pages are written to a temporary file in the target directory and renamed
//! into place, so a browser fetching the page while the enhanced pass
//! rewrites it sees either the old page or the new one, never half of each.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! File names are HTML-escaped where shown and percent-encoded inside URLs.

use crate::config::GalleryConfig;
use crate::imaging::{CellSources, Codec};
use crate::server::encode_segment;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not replace {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// How image cells are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Link and show original files, no image processing.
    Fast,
    /// Embed thumbnails produced by the codec.
    Enhanced,
}

/// Renders and writes gallery pages.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    index_filename: String,
    images_per_row: usize,
    thumbnail_width: u32,
    codec: Codec,
}

impl PageRenderer {
    pub fn new(config: &GalleryConfig, codec: Codec) -> Self {
        Self {
            index_filename: config.index_filename.clone(),
            images_per_row: config.images_per_row.max(1),
            thumbnail_width: config.thumbnails.width,
            codec,
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn index_filename(&self) -> &str {
        &self.index_filename
    }

    /// Path of the page generated for `dir`.
    pub fn index_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.index_filename)
    }

    /// Render the page for `current`, a directory under `root`.
    ///
    /// `images` and `subdirs` are shown in the order given.
    pub fn render(
        &self,
        root: &Path,
        current: &Path,
        images: &[String],
        subdirs: &[String],
        mode: RenderMode,
    ) -> Markup {
        let mut nav: Vec<&str> = Vec::with_capacity(subdirs.len() + 1);
        if current != root {
            nav.push("..");
        }
        nav.extend(subdirs.iter().map(String::as_str));

        let content = html! {
            div.content {
                h2.header {
                    "imageMe: " (current.display()) " [" (images.len()) " image(s)]"
                }
                hr;
                @for dir in &nav {
                    h3.header {
                        a href={ (encode_segment(dir)) "/" (encode_segment(&self.index_filename)) } { (dir) }
                    }
                }
                hr;
                table {
                    @for row in images.chunks(self.images_per_row) {
                        tr {
                            @for filename in row {
                                (self.image_cell(current, filename, mode))
                            }
                        }
                    }
                }
            }
        };

        base_document(&self.stylesheet(), content)
    }

    fn image_cell(&self, dir: &Path, filename: &str, mode: RenderMode) -> Markup {
        let sources = match mode {
            RenderMode::Fast => CellSources::default(),
            RenderMode::Enhanced => self.codec.cell_sources(dir, filename, self.thumbnail_width),
        };
        let link = sources.link.unwrap_or_else(|| encode_segment(filename));
        let src = sources.src.unwrap_or_else(|| encode_segment(filename));
        html! {
            td {
                a href=(link) {
                    img.image src=(src) alt=(filename);
                }
            }
        }
    }

    fn stylesheet(&self) -> String {
        let column_width = 100.0 / self.images_per_row as f64;
        format!("{CSS}\ntd {{width: {column_width:.4}%;}}")
    }

    /// Write a rendered page for `dir`, replacing any previous one atomically.
    pub fn write(&self, dir: &Path, page: &Markup) -> Result<PathBuf, RenderError> {
        let path = self.index_path(dir);
        let mut tmp = tempfile::Builder::new()
            .prefix(".imageme-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(page.0.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| RenderError::Persist {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(path)
    }
}

const CSS: &str = "\
html, body {margin: 0; padding: 0;}
.header {text-align: right;}
.content {padding: 3em; padding-left: 4em; padding-right: 4em;}
.image {max-width: 100%; border-radius: 0.3em;}
td {vertical-align: top;}";

/// Renders the base HTML document structure
fn base_document(css: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "imageMe" }
                style { (PreEscaped(css)) }
            }
            body {
                (content)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
