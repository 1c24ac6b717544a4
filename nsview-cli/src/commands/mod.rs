use anyhow::{Context, Result};
use std::io::{self, BufWriter, StdoutLock, Write};

use nsview_topology::{ProcFs, ReportConfig, Topology};

use crate::cli::{Cli, Commands};
use crate::environment;

pub mod check;
pub mod namespace;
pub mod process;
pub mod show;

/// Dispatch command to appropriate handler
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.report_config();
    let json = cli.display.json;

    match cli.command.unwrap_or(Commands::Show) {
        Commands::Show => show::execute(config, json),
        Commands::Ns { nid } => namespace::execute(config, nid, json),
        Commands::Pid { pid, .. } => process::execute(config, pid, json),
        Commands::Check => check::execute(&config),
    }
}

/// Check the environment and collect the topology it describes
fn collect(config: &mut ReportConfig) -> Result<Topology> {
    let procfs = ProcFs::new(config.proc_root());
    environment::prepare(&procfs, config)?;

    Topology::collect(&procfs).context("Failed to collect namespace topology")
}

/// Run `render` against a locked, buffered stdout
fn with_stdout(
    render: impl FnOnce(&mut BufWriter<StdoutLock<'static>>) -> io::Result<()>,
) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    render(&mut out)?;
    out.flush()?;
    Ok(())
}
