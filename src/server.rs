//! Static file server for the gallery tree.
//!
//! A deliberately small HTTP/1.1 server: `GET` and `HEAD` of files under the
//! gallery root, directory requests resolved to the directory's gallery page,
//! one thread per connection, `Connection: close` on every response.
//!
//! The accept loop runs non-blocking and polls a [`ShutdownListener`] between
//! accepts, so an interrupt stops the server within a few milliseconds.
//! `std::net::TcpListener` enables `SO_REUSEADDR` on Unix, so a restarted
//! gallery can rebind the port immediately.

use std::io::{self, BufRead, BufReader, Read as _, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_HEAD: u64 = 16 * 1024;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Could not bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
}

/// Requests a running server to stop. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Sender<()>,
}

impl Shutdown {
    pub fn trigger(&self) {
        // The listener being gone means the server already stopped.
        let _ = self.tx.send(());
    }
}

/// Receiving end of [`Shutdown`], polled by the accept loop.
#[derive(Debug)]
pub struct ShutdownListener {
    rx: Receiver<()>,
}

impl ShutdownListener {
    /// True once a shutdown was triggered or every [`Shutdown`] handle was
    /// dropped.
    pub fn requested(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }
}

pub fn shutdown_channel() -> (Shutdown, ShutdownListener) {
    let (tx, rx) = mpsc::channel();
    (Shutdown { tx }, ShutdownListener { rx })
}

/// HTTP server rooted at the gallery directory.
#[derive(Debug)]
pub struct GalleryServer {
    listener: TcpListener,
    root: PathBuf,
    index_filename: String,
}

impl GalleryServer {
    pub fn bind(
        host: &str,
        port: u16,
        root: &Path,
        index_filename: &str,
    ) -> Result<Self, ServerError> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr).map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
        Ok(Self {
            listener,
            root: root.to_path_buf(),
            index_filename: index_filename.to_string(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve requests until shutdown is requested.
    ///
    /// Only a failing listening socket ends the loop with an error; broken
    /// client connections are logged and forgotten.
    pub fn serve_until(&self, shutdown: &ShutdownListener) -> Result<(), ServerError> {
        self.listener.set_nonblocking(true)?;
        loop {
            if shutdown.requested() {
                return Ok(());
            }
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let root = self.root.clone();
                    let index_filename = self.index_filename.clone();
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, &root, &index_filename) {
                            tracing::debug!("connection from {} failed: {}", peer, e);
                        }
                    });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!("accept failed: {}", e);
                    return Err(ServerError::Io(e));
                }
            }
        }
    }
}

/// Outcome of mapping a request path onto the gallery tree.
#[derive(Debug, PartialEq)]
pub(crate) enum Resolved {
    File(PathBuf),
    Redirect(String),
    NotFound,
}

pub(crate) fn resolve(root: &Path, index_filename: &str, target: &str) -> Resolved {
    let path = target.split(['?', '#']).next().unwrap_or("/");
    let Some(decoded) = percent_decode(path) else {
        return Resolved::NotFound;
    };

    let relative = Path::new(decoded.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Resolved::NotFound;
    }

    let full = root.join(relative);
    if full.is_dir() {
        if !path.ends_with('/') {
            return Resolved::Redirect(format!("{path}/"));
        }
        let index = full.join(index_filename);
        return if index.is_file() {
            Resolved::File(index)
        } else {
            Resolved::NotFound
        };
    }
    if full.is_file() {
        Resolved::File(full)
    } else {
        Resolved::NotFound
    }
}

/// Percent-encode a file or directory name as one URL path segment.
///
/// Everything outside the RFC 3986 unreserved set is escaped, so `#`, `?`,
/// `%`, spaces and non-ASCII bytes all survive the trip through a browser
/// and [`percent_decode`].
pub fn encode_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Decode `%XX` escapes. Returns `None` for malformed escapes or non-UTF-8.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Read the request line and drain the headers, which never change the
/// response. At most [`MAX_REQUEST_HEAD`] bytes are read; `None` means the
/// head was cut short or too long.
fn read_request_head(reader: impl BufRead) -> io::Result<Option<String>> {
    let mut reader = reader.take(MAX_REQUEST_HEAD);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line)? == 0 || !request_line.ends_with('\n') {
        return Ok(None);
    }
    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header)? == 0 || !header.ends_with('\n') {
            return Ok(None);
        }
        if header.trim().is_empty() {
            return Ok(Some(request_line));
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

fn handle_connection(stream: TcpStream, root: &Path, index_filename: &str) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let reader = BufReader::new(stream.try_clone()?);
    let mut stream = stream;

    let Some(request_line) = read_request_head(reader)? else {
        return respond(&mut stream, "400 Bad Request", "text/plain", b"Bad Request", true);
    };

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");

    if method != "GET" && method != "HEAD" {
        return respond(&mut stream, "501 Not Implemented", "text/plain", b"Not Implemented", true);
    }
    let with_body = method == "GET";

    match resolve(root, index_filename, target) {
        Resolved::File(path) => match std::fs::read(&path) {
            Ok(body) => respond(&mut stream, "200 OK", content_type(&path), &body, with_body),
            // Deleted between resolve and read, e.g. during cleanup.
            Err(_) => respond(&mut stream, "404 Not Found", "text/plain", b"Not Found", with_body),
        },
        Resolved::Redirect(location) => {
            let header = format!(
                "HTTP/1.1 301 Moved Permanently\r\n\
                 Location: {location}\r\n\
                 Content-Length: 0\r\n\
                 Connection: close\r\n\
                 \r\n"
            );
            stream.write_all(header.as_bytes())
        }
        Resolved::NotFound => {
            respond(&mut stream, "404 Not Found", "text/plain", b"Not Found", with_body)
        }
    }
}

fn respond(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
    with_body: bool,
) -> io::Result<()> {
    let header = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    stream.write_all(header.as_bytes())?;
    if with_body {
        stream.write_all(body)?;
    }
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_text;
    use std::io::Read;
    use tempfile::TempDir;

    fn gallery() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write_text(&tmp.path().join("imageme.html"), "<html>root</html>");
        write_text(&tmp.path().join("my photo.png"), "png");
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        write_text(&tmp.path().join("sub/imageme.html"), "<html>sub</html>");
        std::fs::create_dir(tmp.path().join("empty")).unwrap();
        tmp
    }

    // =========================================================================
    // Path resolution
    // =========================================================================

    #[test]
    fn root_resolves_to_index() {
        let tmp = gallery();
        assert_eq!(
            resolve(tmp.path(), "imageme.html", "/"),
            Resolved::File(tmp.path().join("imageme.html"))
        );
    }

    #[test]
    fn directory_without_slash_redirects() {
        let tmp = gallery();
        assert_eq!(
            resolve(tmp.path(), "imageme.html", "/sub"),
            Resolved::Redirect("/sub/".to_string())
        );
        assert_eq!(
            resolve(tmp.path(), "imageme.html", "/sub/"),
            Resolved::File(tmp.path().join("sub/imageme.html"))
        );
    }

    #[test]
    fn directory_without_page_is_not_found() {
        let tmp = gallery();
        assert_eq!(
            resolve(tmp.path(), "imageme.html", "/empty/"),
            Resolved::NotFound
        );
    }

    #[test]
    fn percent_escapes_are_decoded() {
        let tmp = gallery();
        assert_eq!(
            resolve(tmp.path(), "imageme.html", "/my%20photo.png"),
            Resolved::File(tmp.path().join("my photo.png"))
        );
    }

    #[test]
    fn query_string_is_ignored() {
        let tmp = gallery();
        assert_eq!(
            resolve(tmp.path(), "imageme.html", "/imageme.html?v=2"),
            Resolved::File(tmp.path().join("imageme.html"))
        );
    }

    #[test]
    fn parent_components_are_rejected() {
        let tmp = gallery();
        assert_eq!(
            resolve(tmp.path(), "imageme.html", "/../etc/passwd"),
            Resolved::NotFound
        );
        assert_eq!(
            resolve(tmp.path(), "imageme.html", "/sub/%2e%2e/%2e%2e/secret"),
            Resolved::NotFound
        );
    }

    #[test]
    fn malformed_escapes_are_not_found() {
        let tmp = gallery();
        assert_eq!(resolve(tmp.path(), "imageme.html", "/%zz"), Resolved::NotFound);
        assert_eq!(resolve(tmp.path(), "imageme.html", "/%2"), Resolved::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn encoded_names_decode_back_to_the_file() {
        let tmp = gallery();
        for name in ["50%25.png", "a#1.png", "q?.png", "café.png"] {
            write_text(&tmp.path().join(name), "x");
            let target = format!("/{}", encode_segment(name));
            assert_eq!(
                resolve(tmp.path(), "imageme.html", &target),
                Resolved::File(tmp.path().join(name)),
                "{name} via {target}"
            );
        }
    }

    #[test]
    fn unreserved_characters_are_left_alone() {
        assert_eq!(encode_segment("IMG_0001-v2.final~.jpg"), "IMG_0001-v2.final~.jpg");
        assert_eq!(encode_segment(".."), "..");
        assert_eq!(encode_segment("my photo#1?.png"), "my%20photo%231%3F.png");
    }

    // =========================================================================
    // Request head
    // =========================================================================

    #[test]
    fn request_head_returns_request_line() {
        let head = "GET /a.png HTTP/1.1\r\nHost: x\r\nAccept: */*\r\n\r\n";
        let line = read_request_head(head.as_bytes()).unwrap();
        assert_eq!(line.as_deref(), Some("GET /a.png HTTP/1.1\r\n"));
    }

    #[test]
    fn request_head_without_blank_line_is_rejected() {
        let head = "GET / HTTP/1.1\r\nHost: x\r\n";
        assert_eq!(read_request_head(head.as_bytes()).unwrap(), None);
        assert_eq!(read_request_head(&b""[..]).unwrap(), None);
    }

    #[test]
    fn oversized_request_head_is_rejected() {
        let long_line = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(64 * 1024));
        assert_eq!(read_request_head(long_line.as_bytes()).unwrap(), None);

        let mut endless_headers = String::from("GET / HTTP/1.1\r\n");
        for i in 0..10_000 {
            endless_headers.push_str(&format!("X-Filler-{i}: yes\r\n"));
        }
        endless_headers.push_str("\r\n");
        assert_eq!(read_request_head(endless_headers.as_bytes()).unwrap(), None);
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type(Path::new("a.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type(Path::new("a.tif")), "image/tiff");
        assert_eq!(content_type(Path::new("README")), "application/octet-stream");
    }

    // =========================================================================
    // Live server
    // =========================================================================

    fn request(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(raw.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn serves_until_shutdown() {
        let tmp = gallery();
        let server = GalleryServer::bind("127.0.0.1", 0, tmp.path(), "imageme.html").unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown, listener) = shutdown_channel();

        let handle = thread::spawn(move || server.serve_until(&listener));

        let ok = request(addr, "GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        assert!(ok.starts_with("HTTP/1.1 200 OK"));
        assert!(ok.contains("Content-Type: text/html"));
        assert!(ok.ends_with("<html>root</html>"));

        let head = request(addr, "HEAD /sub/ HTTP/1.1\r\n\r\n");
        assert!(head.starts_with("HTTP/1.1 200 OK"));
        assert!(head.contains("Content-Length: 16"));
        assert!(!head.contains("<html>"));

        let moved = request(addr, "GET /sub HTTP/1.1\r\n\r\n");
        assert!(moved.starts_with("HTTP/1.1 301"));
        assert!(moved.contains("Location: /sub/"));

        let missing = request(addr, "GET /nope.png HTTP/1.1\r\n\r\n");
        assert!(missing.starts_with("HTTP/1.1 404"));

        let post = request(addr, "POST / HTTP/1.1\r\n\r\n");
        assert!(post.starts_with("HTTP/1.1 501"));

        shutdown.trigger();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn dropped_shutdown_handle_stops_server() {
        let tmp = gallery();
        let server = GalleryServer::bind("127.0.0.1", 0, tmp.path(), "imageme.html").unwrap();
        let (shutdown, listener) = shutdown_channel();
        drop(shutdown);
        assert!(server.serve_until(&listener).is_ok());
    }

    #[test]
    fn port_in_use_is_a_bind_error() {
        let tmp = gallery();
        let first = GalleryServer::bind("127.0.0.1", 0, tmp.path(), "imageme.html").unwrap();
        let port = first.local_addr().unwrap().port();
        let err = GalleryServer::bind("127.0.0.1", port, tmp.path(), "imageme.html").unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
