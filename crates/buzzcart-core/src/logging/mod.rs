//! Logging setup shared by the binaries
//!
//! Console output always goes through `tracing_subscriber::fmt`, filtered by
//! `RUST_LOG` or the verbosity flag. With a log directory, debug-and-above
//! events are also appended to a per-device JSONL file that [`read_entries`]
//! can load back (or `jq` can query).
//!
//! ```bash
//! # Errors from one device
//! jq 'select(.level == "error")' logs/pixel/*.jsonl
//! ```

mod entry;
mod layer;
mod writer;

use std::path::PathBuf;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub use entry::LogEntry;
pub use layer::JsonlLayer;
pub use writer::{read_entries, DeviceLogWriter, LogQuery};

/// Console filter directive for a `-v` count
pub fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// How to set up the global subscriber
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: u8,
    /// Write JSONL files here as well as to the console
    pub log_dir: Option<PathBuf>,
    pub device: String,
    /// Write console output to stderr (keeps stdout for command output)
    pub stderr: bool,
}

/// Install the global subscriber. Returns the JSONL file path when one is
/// being written.
///
/// `RUST_LOG` and `verbose` only affect the console. The JSONL file always
/// records debug and above.
pub fn init(options: &LogOptions) -> std::io::Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(options.verbose)));

    let console = if options.stderr {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_filter(filter).boxed()
    };

    let jsonl = match options.log_dir {
        Some(ref dir) => Some(JsonlLayer::new(dir, options.device.clone())?),
        None => None,
    };
    let log_path = jsonl.as_ref().map(|l| l.log_path().to_path_buf());

    tracing_subscriber::registry()
        .with(console)
        .with(jsonl.map(|l| l.with_filter(LevelFilter::DEBUG)))
        .init();
    Ok(log_path)
}
