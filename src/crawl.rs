//! Directory crawling and page generation.
//!
//! Walks the gallery root recursively and writes one page per directory. A
//! crawl produces a [`CrawlManifest`]: the list of pages it wrote, which is
//! exactly what cleanup needs to remove later.
//!
//! ## Traversal
//!
//! ```text
//! photos/                  → photos/imageme.html      (2 images, link to sub)
//! ├── a.png
//! ├── b.jpg
//! ├── notes.txt            (ignored: not an image)
//! └── sub/                 → photos/sub/imageme.html  (1 image, link to ..)
//!     └── d.gif
//! ```
//!
//! - Symlinks are never followed, so link cycles cannot trap the walk.
//!   Symlinked *files* still show up as images; symlinked directories do not
//!   show up at all since they would never get a page of their own.
//! - Entries are visited in name order, parents before children.
//! - A directory that cannot be read, or whose page cannot be written, is
//!   logged and skipped. Its siblings are unaffected.

use crate::classify;
use crate::render::{PageRenderer, RenderMode};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Gallery root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// The contents of one directory, as shown on its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub path: PathBuf,
    /// Image file names, sorted ascending.
    pub images: Vec<String>,
    /// Subdirectory names, sorted ascending.
    pub subdirs: Vec<String>,
}

/// Pages written by one crawl, in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlManifest {
    pub pages: Vec<PathBuf>,
}

impl CrawlManifest {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.pages.iter().map(PathBuf::as_path)
    }
}

/// Progress reported while crawling.
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    DirectoryStarted {
        path: PathBuf,
        mode: RenderMode,
    },
    PageWritten {
        page: PathBuf,
        image_count: usize,
        subdir_count: usize,
    },
    DirectorySkipped {
        path: PathBuf,
        reason: String,
    },
}

/// One directory entry, as far as a page cares.
struct Listed {
    name: String,
    is_dir: bool,
    is_image: bool,
}

/// List one directory: image files and real subdirectories, both sorted.
///
/// An entry that cannot be inspected is logged and left out; the rest of
/// the directory is still listed.
pub fn read_directory(path: &Path) -> Result<DirectoryNode, CrawlError> {
    let entries = fs::read_dir(path)?.map(|entry| -> io::Result<Listed> {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        Ok(Listed {
            name: entry.file_name().to_string_lossy().to_string(),
            is_dir,
            is_image: !is_dir && classify::is_image(&entry.path()),
        })
    });
    Ok(collect_node(path, entries))
}

fn collect_node(path: &Path, entries: impl IntoIterator<Item = io::Result<Listed>>) -> DirectoryNode {
    let mut images = Vec::new();
    let mut subdirs = Vec::new();

    for entry in entries {
        match entry {
            Ok(Listed { name, is_dir: true, .. }) => subdirs.push(name),
            Ok(Listed { name, is_image: true, .. }) => images.push(name),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("skipping unreadable entry in {}: {}", path.display(), e);
            }
        }
    }

    images.sort();
    subdirs.sort();
    DirectoryNode {
        path: path.to_path_buf(),
        images,
        subdirs,
    }
}

/// Crawl `root` and write a page for every directory in it.
///
/// Only a root that is not a directory is an error; everything below the
/// root fails softly.
pub fn crawl(
    root: &Path,
    renderer: &PageRenderer,
    mode: RenderMode,
    events: Option<&Sender<CrawlEvent>>,
) -> Result<CrawlManifest, CrawlError> {
    if !root.is_dir() {
        return Err(CrawlError::NotADirectory(root.to_path_buf()));
    }

    let emit = |event: CrawlEvent| {
        if let Some(tx) = events {
            // A dropped receiver only means nobody is printing progress.
            let _ = tx.send(event);
        }
    };

    let mut manifest = CrawlManifest::default();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // The directory itself was already yielded (and reported) before
                // walkdir failed to descend into it.
                tracing::debug!("walk error: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let dir = entry.path();
        emit(CrawlEvent::DirectoryStarted {
            path: dir.to_path_buf(),
            mode,
        });

        let node = match read_directory(dir) {
            Ok(node) => node,
            Err(e) => {
                tracing::warn!("skipping unreadable directory {}: {}", dir.display(), e);
                emit(CrawlEvent::DirectorySkipped {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let page = renderer.render(root, dir, &node.images, &node.subdirs, mode);
        match renderer.write(dir, &page) {
            Ok(path) => {
                emit(CrawlEvent::PageWritten {
                    page: path.clone(),
                    image_count: node.images.len(),
                    subdir_count: node.subdirs.len(),
                });
                manifest.pages.push(path);
            }
            Err(e) => {
                tracing::warn!("could not write page in {}: {}", dir.display(), e);
                emit(CrawlEvent::DirectorySkipped {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(manifest)
}
