//! # imageMe
//!
//! A throwaway image gallery for any directory. Run it inside a folder of
//! photos, open the printed URL, browse, then hit Ctrl-C: every page it wrote
//! is removed again and the tree is left as it was found.
//!
//! # Architecture: Two Passes, One Server
//!
//! ```text
//! 1. Fast pass       root/  →  one index page per directory, linking originals
//! 2. Serve           HTTP over the tree, pages and images alike
//! 3. Enhanced pass   (background, optional) rewrite pages with inline thumbnails
//! 4. Clean up        on interrupt, delete every page either pass wrote
//! ```
//!
//! The fast pass touches nothing but directory listings, so the gallery is
//! browsable within moments even for large trees. Thumbnailing is slow and
//! needs decoders, so it runs behind the server and its pages replace the fast
//! ones atomically as they are finished.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`classify`] | Which files count as images, and which the browser can show directly |
//! | [`config`] | Optional `imageme.toml` loading and validation |
//! | [`crawl`] | Walks the tree, writes one page per directory, records what it wrote |
//! | [`render`] | Builds index pages with Maud and writes them atomically |
//! | [`imaging`] | Decode, thumbnail, and inline-encode images behind a swappable backend |
//! | [`server`] | Minimal static HTTP server rooted at the gallery |
//! | [`session`] | Runs the passes and the server, then cleans up |
//! | [`cleanup`] | Deletes recorded pages |
//! | [`output`] | Console output formatting |
//!
//! # Design Decisions
//!
//! ## Pages Are Temporary
//!
//! Generated pages live next to the images they index, because that is where
//! a plain file server can find them. The price is that they must be removed
//! afterwards. Cleanup only ever deletes paths a crawl recorded writing, never
//! "every file called `imageme.html`", so a user's own file of that name in a
//! directory the crawl skipped is left alone.
//!
//! ## Thumbnails Are Optional
//!
//! Decoder availability is probed once and carried as a [`imaging::Codec`]
//! value. When it is unavailable the enhanced pass simply does not run; the
//! fast pages are a complete gallery on their own.

pub mod classify;
pub mod cleanup;
pub mod config;
pub mod crawl;
pub mod imaging;
pub mod output;
pub mod render;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
