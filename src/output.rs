//! Console output for a gallery session.
//!
//! # Architecture
//!
//! Each message has a `format_*` function (returns `Vec<String>` or
//! `String`) for testability and, where the session prints it directly, a
//! `print_*` wrapper that writes to stdout. Format functions are pure: no
//! I/O, no side effects.
//!
//! Diagnostics (unreadable files, socket errors) do not come through here;
//! they are `tracing` events on stderr.
//!
//! # Output Format
//!
//! ```text
//! Thumbnails: available, pages will be enhanced in the background
//! Processing . (fast)
//!     2 image(s), 1 subdirectory → ./imageme.html
//! Processing ./sub (fast)
//!     1 image(s), 0 subdirectories → ./sub/imageme.html
//! Your images are at http://127.0.0.1:8000/imageme.html
//! User interrupted, stopping
//! Cleaning up
//!     Removing ./imageme.html
//!     Removing ./sub/imageme.html
//! ```

use crate::cleanup::CleanupReport;
use crate::crawl::CrawlEvent;
use crate::imaging::Codec;
use crate::render::RenderMode;

fn mode_label(mode: RenderMode) -> &'static str {
    match mode {
        RenderMode::Fast => "fast",
        RenderMode::Enhanced => "enhanced",
    }
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Announce whether thumbnails will be produced this session.
pub fn format_capability(codec: &Codec) -> String {
    if codec.is_available() {
        "Thumbnails: available, pages will be enhanced in the background".to_string()
    } else {
        "Thumbnails: unavailable, images are shown unprocessed".to_string()
    }
}

pub fn print_capability(codec: &Codec) {
    println!("{}", format_capability(codec));
}

/// Format a single crawl progress event as display lines.
pub fn format_crawl_event(event: &CrawlEvent) -> Vec<String> {
    match event {
        CrawlEvent::DirectoryStarted { path, mode } => {
            vec![format!("Processing {} ({})", path.display(), mode_label(*mode))]
        }
        CrawlEvent::PageWritten {
            page,
            image_count,
            subdir_count,
        } => vec![format!(
            "    {} image(s), {} \u{2192} {}",
            image_count,
            plural(*subdir_count, "subdirectory", "subdirectories"),
            page.display()
        )],
        CrawlEvent::DirectorySkipped { path, reason } => {
            vec![format!("    Skipped {}: {}", path.display(), reason)]
        }
    }
}

/// The URL to browse. Always the loopback address, whatever the bind
/// address is.
pub fn format_serving(port: u16, index_filename: &str) -> String {
    format!("Your images are at http://127.0.0.1:{port}/{index_filename}")
}

pub fn print_serving(port: u16, index_filename: &str) {
    println!("{}", format_serving(port, index_filename));
}

pub fn format_stopping(interrupted: bool) -> String {
    if interrupted {
        "User interrupted, stopping".to_string()
    } else {
        "Server error, stopping".to_string()
    }
}

pub fn print_stopping(interrupted: bool) {
    println!("{}", format_stopping(interrupted));
}

/// Format what cleanup did, one line per page.
pub fn format_cleanup(report: &CleanupReport) -> Vec<String> {
    let mut lines = vec!["Cleaning up".to_string()];
    for path in &report.removed {
        lines.push(format!("    Removing {}", path.display()));
    }
    for path in &report.missing {
        lines.push(format!("    Already gone {}", path.display()));
    }
    for (path, reason) in &report.failed {
        lines.push(format!("    Could not remove {}: {}", path.display(), reason));
    }
    lines
}

pub fn print_cleanup(report: &CleanupReport) {
    for line in format_cleanup(report) {
        println!("{}", line);
    }
}
