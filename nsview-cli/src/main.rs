//! nsview - Linux namespace topology viewer
//!
//! Lists the namespaces of every kind on a running system as per-kind
//! forests, with their creators, member processes and id mappings.

use clap::Parser;
use std::process;
use tracing::Level;

mod cli;
mod commands;
mod environment;
mod render;

use cli::Cli;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // stdout carries the report, so logs go to stderr
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = commands::dispatch(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
