//! Removal of generated pages at shutdown.
//!
//! Only paths recorded in a crawl manifest are ever deleted. A page that is
//! already gone is not an error: the enhanced pass may still be renaming a
//! fresh page into place while cleanup runs, so a delete can race a write
//! either way.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What cleanup did with each page.
#[derive(Debug, Default, PartialEq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// Pages that no longer existed.
    pub missing: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every listed page once, in order of first appearance.
pub fn clean_up<'a>(pages: impl IntoIterator<Item = &'a Path>) -> CleanupReport {
    let mut seen = HashSet::new();
    let mut report = CleanupReport::default();

    for page in pages {
        if !seen.insert(page) {
            continue;
        }
        match fs::remove_file(page) {
            Ok(()) => report.removed.push(page.to_path_buf()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                report.missing.push(page.to_path_buf());
            }
            Err(e) => {
                tracing::warn!("could not remove {}: {}", page.display(), e);
                report.failed.push((page.to_path_buf(), e.to_string()));
            }
        }
    }

    report
}
