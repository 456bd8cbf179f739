mod screens;
mod shell;

use std::path::PathBuf;

use anyhow::Result;
use buzzcart_core::logging::{self, LogOptions};
use buzzcart_core::{BuzzCartApp, BuzzConfig};
use clap::Parser;

/// BuzzCart - interactive shell
#[derive(Parser, Debug)]
#[command(name = "buzzcart-shell")]
#[command(about = "BuzzCart - browse tabs, search people and follow them from a terminal")]
struct Args {
    /// Data directory for storage (use different dirs for multiple devices)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Device name (creates data dir: ~/.buzzcart/<device>, names the log files)
    #[arg(short = 'n', long, default_value = "default")]
    device: String,

    /// Also write JSONL logs under this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_data_dir(device: &str) -> PathBuf {
    let base = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".buzzcart");
    if device == "default" {
        base.join("data")
    } else {
        base.join(device)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = logging::init(&LogOptions {
        verbose: args.verbose,
        log_dir: args.log_dir.clone(),
        device: args.device.clone(),
        stderr: true,
    })?;

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| default_data_dir(&args.device));
    tracing::info!(device = %args.device, ?data_dir, ?log_path, "Starting shell");

    let config = BuzzConfig::new(data_dir);
    let app = BuzzCartApp::open(&config)?;
    let mut shell = shell::Shell::new(app, config.snapshot_path());
    shell.run().await
}
