//! Structured logging bootstrap for an embedding worker process.
//!
//! Grounded on `examples/biuld-naviscope/src/logging.rs`: a daily rolling
//! file appender under a dotfile directory, an `EnvFilter` defaulting to
//! `info`, and a non-blocking writer so logging never stalls a stabilisation
//! hot loop (§5: "the algorithmic core does not suspend").

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialises the global `tracing` subscriber for a worker process named
/// `component` (e.g. `"worker-3"`, `"gene-pool-boot"`). Logs roll daily
/// under `~/.egp/logs/<component>.log.<date>`.
///
/// Returns the [`WorkerGuard`] that must be kept alive for the duration of
/// the process; dropping it flushes and stops the background writer thread.
pub fn init(component: &str) -> WorkerGuard {
    let home = dirs::home_dir().unwrap_or_else(|| Path::new(".").to_path_buf());
    let log_dir = home.join(".egp/logs");
    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, component);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false).with_target(true);

    let _ = tracing_subscriber::registry().with(filter).with(file_layer).try_init();

    guard
}
