//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use nsview_core::{KindSet, NamespaceId, NamespaceKind, ProcessId};
use nsview_topology::ReportConfig;
use nsview_topology::config::DEFAULT_PROC_ROOT;

#[derive(Parser)]
#[command(name = "nsview")]
#[command(about = "Show the namespace topology of a running Linux system", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Mount point of procfs
    #[arg(
        short = 'm',
        long = "proc-mnt",
        value_name = "PATH",
        default_value = DEFAULT_PROC_ROOT,
        global = true
    )]
    pub proc_mnt: PathBuf,

    #[command(flatten)]
    pub display: DisplayArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// What to print for each namespace
#[derive(Args, Debug, Clone, Default)]
pub struct DisplayArgs {
    /// Namespace kinds to show, comma separated (cgroup, ipc, mnt, net, pid, user, uts)
    #[arg(
        short = 't',
        long = "ns-type",
        value_name = "KIND",
        value_delimiter = ',',
        global = true
    )]
    pub kinds: Vec<NamespaceKind>,

    /// List the processes of every namespace
    #[arg(short = 'r', long = "show-procs", global = true)]
    pub show_procs: bool,

    /// Show extended namespace information
    #[arg(short = 'e', long = "extend-info", global = true)]
    pub extend_info: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the namespace forest of every kind (default)
    Show,

    /// Show one namespace
    Ns {
        /// Namespace id (inode number)
        nid: NamespaceId,
    },

    /// Show the namespaces of one process
    Pid {
        /// Process id
        pid: ProcessId,

        /// Include the namespaces below the process's own
        #[arg(short, long)]
        descendants: bool,
    },

    /// Check that this system can be inspected
    Check,
}

impl Cli {
    /// Report configuration from the parsed arguments
    pub fn report_config(&self) -> ReportConfig {
        let kinds = if self.display.kinds.is_empty() {
            KindSet::ALL
        } else {
            self.display.kinds.iter().copied().collect()
        };

        let descendants = matches!(
            self.command,
            Some(Commands::Pid {
                descendants: true,
                ..
            })
        );

        ReportConfig::new()
            .with_proc_root(self.proc_mnt.clone())
            .with_kinds(kinds)
            .with_members(self.display.show_procs)
            .with_extended(self.display.extend_info)
            .with_descendants(descendants)
    }
}
