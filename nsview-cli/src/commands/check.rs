//! Environment check command

use anyhow::Result;

use nsview_topology::{NamespaceSource, ProcFs, ReportConfig};

use crate::environment;

/// Execute environment check command
pub fn execute(config: &ReportConfig) -> Result<()> {
    let procfs = ProcFs::new(config.proc_root());

    println!("\nnsview environment check\n");
    println!("{:-<60}", "");

    // Check 1: procfs
    check_procfs(&procfs)?;

    // Check 2: Permissions
    check_permissions();

    // Check 3: Namespace support
    check_namespace_support(&procfs);

    println!("{:-<60}", "");
    println!();

    Ok(())
}

fn check_procfs(procfs: &ProcFs) -> Result<()> {
    print!("Checking procfs at {}... ", procfs.root().display());

    if !procfs.is_accessible() {
        println!("❌ NOT READABLE");
        anyhow::bail!(
            "Cannot read {}\n\
             \n\
             Mount procfs there or point --proc-mnt at its mount point.",
            procfs.root().display()
        );
    }

    match procfs.processes() {
        Ok(processes) if processes.is_empty() => {
            println!("⚠️  NO PROCESSES");
        }
        Ok(processes) => println!("✅ OK ({} processes)", processes.len()),
        Err(e) => {
            println!("❌ ERROR");
            anyhow::bail!("Could not list processes: {e}");
        }
    }

    Ok(())
}

fn check_permissions() {
    print!("Checking permissions... ");

    if environment::is_root() {
        println!("✅ OK (root)");
    } else {
        println!("⚠️  NOT ROOT");
        println!("   Namespaces of other users' processes cannot be resolved");
    }
}

fn check_namespace_support(procfs: &ProcFs) {
    print!("Checking namespace support... ");

    let missing = environment::unsupported_kinds(procfs);
    if missing.is_empty() {
        println!("✅ OK (all types available)");
    } else {
        println!("⚠️  INCOMPLETE");
        println!("   Missing: {missing}");
    }
}
