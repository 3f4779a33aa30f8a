//! The serving session: fast pass, serving, background enhancement, cleanup.
//!
//! ```text
//! Idle ──► FastPassRunning ──► Serving ──────────────► Stopping ──► CleanedUp
//!                                 │                        ▲
//!                                 └─ enhanced pass thread ─┘ (joined with a grace period)
//! ```
//!
//! The fast pass runs synchronously and must finish before the gallery URL
//! is announced. Serving starts right after; when the codec is available an
//! enhanced pass rewrites every page on a background thread while requests
//! are already being answered. The two passes write the same files, and
//! page writes are atomic, so a browser sees either version of a page.
//!
//! On shutdown the enhanced pass gets a short grace period to finish. It is
//! never cancelled: if it is still running when cleanup starts, a page it
//! writes afterwards may survive the session. That race is accepted.

use crate::cleanup::{self, CleanupReport};
use crate::config::GalleryConfig;
use crate::crawl::{self, CrawlError, CrawlEvent, CrawlManifest};
use crate::imaging::Codec;
use crate::output;
use crate::render::{PageRenderer, RenderMode};
use crate::server::{GalleryServer, ServerError, ShutdownListener};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Crawl failed: {0}")]
    Crawl(#[from] CrawlError),
    #[error("Server failed: {0}")]
    Server(#[from] ServerError),
    #[error("Invalid session transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    FastPassRunning,
    Serving,
    Stopping,
    CleanedUp,
}

/// Everything a finished session did.
#[derive(Debug)]
pub struct SessionReport {
    pub fast: CrawlManifest,
    /// Present when an enhanced pass ran and finished before cleanup.
    pub enhanced: Option<CrawlManifest>,
    pub cleanup: CleanupReport,
}

/// One gallery session over a root directory.
pub struct Session {
    root: PathBuf,
    config: GalleryConfig,
    renderer: Arc<PageRenderer>,
    state: SessionState,
    fast: CrawlManifest,
    background: Option<JoinHandle<Result<CrawlManifest, CrawlError>>>,
    events: Option<Sender<CrawlEvent>>,
}

impl Session {
    pub fn new(root: &Path, config: GalleryConfig, codec: Codec) -> Self {
        let renderer = Arc::new(PageRenderer::new(&config, codec));
        Self {
            root: root.to_path_buf(),
            config,
            renderer,
            state: SessionState::Idle,
            fast: CrawlManifest::default(),
            background: None,
            events: None,
        }
    }

    /// Report crawl progress on `tx` for both passes.
    pub fn with_events(mut self, tx: Sender<CrawlEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn codec(&self) -> &Codec {
        self.renderer.codec()
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> Result<(), SessionError> {
        if self.state != from {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Write every page without image processing.
    pub fn run_fast_pass(&mut self) -> Result<&CrawlManifest, SessionError> {
        self.transition(SessionState::Idle, SessionState::FastPassRunning)?;
        match crawl::crawl(
            &self.root,
            &self.renderer,
            RenderMode::Fast,
            self.events.as_ref(),
        ) {
            Ok(manifest) => {
                self.fast = manifest;
                self.state = SessionState::Serving;
                Ok(&self.fast)
            }
            Err(e) => {
                // Nothing was written; there is nothing left to serve or clean.
                self.state = SessionState::CleanedUp;
                Err(e.into())
            }
        }
    }

    /// Start the enhanced pass on a background thread.
    ///
    /// Returns false, and does nothing, when the codec is unavailable or a
    /// pass was already started.
    pub fn start_background_pass(&mut self) -> Result<bool, SessionError> {
        if self.state != SessionState::Serving {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: SessionState::Serving,
            });
        }
        if !self.renderer.codec().is_available() || self.background.is_some() {
            return Ok(false);
        }

        let root = self.root.clone();
        let renderer = Arc::clone(&self.renderer);
        let events = self.events.clone();
        self.background = Some(thread::spawn(move || {
            crawl::crawl(&root, &renderer, RenderMode::Enhanced, events.as_ref())
        }));
        Ok(true)
    }

    /// Serve until shutdown is requested or the server fails.
    pub fn serve(
        &mut self,
        server: &GalleryServer,
        shutdown: &ShutdownListener,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Serving {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: SessionState::Serving,
            });
        }
        server.serve_until(shutdown)?;
        Ok(())
    }

    /// Stop: give the enhanced pass its grace period, then delete every
    /// page either pass wrote.
    pub fn shut_down(mut self) -> SessionReport {
        self.state = SessionState::Stopping;
        let enhanced = self.await_background(self.config.thumbnails.grace_period());

        let pages = self
            .fast
            .iter()
            .chain(enhanced.iter().flat_map(|manifest| manifest.iter()));
        let cleanup = cleanup::clean_up(pages);
        self.state = SessionState::CleanedUp;

        SessionReport {
            fast: self.fast,
            enhanced,
            cleanup,
        }
    }

    fn await_background(&mut self, grace: Duration) -> Option<CrawlManifest> {
        let handle = self.background.take()?;
        let deadline = Instant::now() + grace;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::info!("enhanced pass still running, cleaning up without it");
                return None;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }
        match handle.join() {
            Ok(Ok(manifest)) => Some(manifest),
            Ok(Err(e)) => {
                tracing::warn!("enhanced pass failed: {}", e);
                None
            }
            Err(_) => {
                tracing::error!("enhanced pass panicked");
                None
            }
        }
    }
}

/// Run a whole session: fast pass, serve, enhance, clean up.
///
/// Cleanup runs whenever a fast pass wrote pages, including when the server
/// cannot bind or fails while serving.
pub fn run(
    root: &Path,
    config: GalleryConfig,
    codec: Codec,
    shutdown: &ShutdownListener,
    events: Option<Sender<CrawlEvent>>,
) -> Result<SessionReport, SessionError> {
    let host = config.server.bind.clone();
    let port = config.server.port;
    let index_filename = config.index_filename.clone();

    let mut session = Session::new(root, config, codec);
    if let Some(tx) = events {
        session = session.with_events(tx);
    }

    session.run_fast_pass()?;

    let server = match GalleryServer::bind(&host, port, root, &index_filename) {
        Ok(server) => server,
        Err(e) => {
            output::print_cleanup(&session.shut_down().cleanup);
            return Err(e.into());
        }
    };
    let bound_port = server.local_addr().map(|a| a.port()).unwrap_or(port);
    output::print_serving(bound_port, &index_filename);

    session.start_background_pass()?;
    let served = session.serve(&server, shutdown);
    drop(server);

    output::print_stopping(served.is_ok());
    let report = session.shut_down();
    output::print_cleanup(&report.cleanup);

    served.map(|()| report)
}
