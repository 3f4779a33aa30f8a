use clap::Parser;
use imageme::imaging::Codec;
use imageme::{config, output, server, session};
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const PRINTER_DRAIN: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "imageme")]
#[command(about = "Browse the images under the current directory in a web browser")]
#[command(long_about = "\
Browse the images under the current directory in a web browser

Writes an index page into every directory below the current one, serves the
tree over HTTP, and removes every page it wrote when interrupted (Ctrl-C).

When image decoders are available, pages are rewritten in the background
with inline thumbnails once the gallery is up.

Settings are read from ./imageme.toml when present:

  index_filename = \"imageme.html\"
  images_per_row = 3

  [thumbnails]
  enabled = true
  width = 800
  grace_period_ms = 500

  [server]
  bind = \"0.0.0.0\"
  port = 8000")]
#[command(version)]
struct Cli {
    /// Port to serve on (overrides the configured port)
    port: Option<u16>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("imageme=info".parse()?))
        .init();

    let root = Path::new(".");
    let mut config = config::load_config(root)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let codec = Codec::probe(&config.thumbnails);
    output::print_capability(&codec);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = thread::spawn(move || {
        for event in rx {
            for line in output::format_crawl_event(&event) {
                println!("{}", line);
            }
        }
    });

    let (shutdown, listener) = server::shutdown_channel();
    ctrlc::set_handler(move || shutdown.trigger())?;

    let result = session::run(root, config, codec, &listener, Some(tx));
    drain_printer(printer);
    result?;
    Ok(())
}

/// Give the printer a moment to flush queued progress lines.
///
/// The printer ends once every sender is gone. An enhanced pass still running
/// past its grace period keeps one alive, so the wait is bounded and its
/// remaining lines are dropped.
fn drain_printer(printer: JoinHandle<()>) {
    let deadline = Instant::now() + PRINTER_DRAIN;
    while !printer.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    if printer.is_finished() {
        let _ = printer.join();
    }
}
