//! Captain's Log - a command-line logbook for boats, trips, notes and maintenance.
//!
//! Changes are applied to the local cache first and confirmed or rolled back
//! once the server answers.

mod app;
mod commands;
mod display;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use commands::Cli;

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file on drop.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    // RUST_LOG controls the level unless -v was given
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let (file_layer, guard) = match log_file.and_then(|p| p.file_name().map(|name| (p, name))) {
        Some((path, name)) => {
            let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_file.as_deref());
    info!(version = env!("CARGO_PKG_VERSION"), "Captain's Log starting");

    let mut app = App::new(cli.api_url, cli.json)?;
    app.run(cli.command).await
}
