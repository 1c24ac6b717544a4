//! Checks that run before the topology is collected

use anyhow::{Context, Result, bail};
use tracing::warn;

use nsview_topology::{KindSet, ProcFs, ReportConfig};

/// Check if running as root
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Make sure `procfs` can be read and drop the kinds it does not expose
///
/// Warns instead of failing when not running as root or when a requested
/// kind is unsupported.
pub fn prepare(procfs: &ProcFs, config: &mut ReportConfig) -> Result<()> {
    if !procfs.is_accessible() {
        bail!("Cannot read proc mount point {}", procfs.root().display());
    }

    if !is_root() {
        warn!("Not running as root, some namespaces may be missing");
    }

    let removed = config.restrict_to(procfs.supported_kinds());
    for kind in removed.iter() {
        warn!("System does not support {kind} namespace");
    }

    config
        .validate()
        .context("No requested namespace kind is supported")?;

    Ok(())
}

/// Kinds the kernel behind `procfs` does not expose
pub fn unsupported_kinds(procfs: &ProcFs) -> KindSet {
    KindSet::ALL.difference(procfs.supported_kinds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsview_topology::NamespaceKind;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn proc_root(kinds: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        let ns = tmp.path().join("self/ns");
        fs::create_dir_all(&ns).unwrap();
        for name in kinds {
            symlink(format!("{name}:[1]"), ns.join(name)).unwrap();
        }
        tmp
    }

    #[test]
    fn test_prepare_drops_unsupported_kinds() {
        let tmp = proc_root(&["ipc", "mnt", "net", "pid", "user", "uts"]);
        let procfs = ProcFs::new(tmp.path());
        let mut config = ReportConfig::new().with_proc_root(tmp.path());

        prepare(&procfs, &mut config).unwrap();

        assert!(!config.kinds.contains(NamespaceKind::Cgroup));
        assert_eq!(config.kinds.len(), 6);
        assert_eq!(unsupported_kinds(&procfs), KindSet::only(NamespaceKind::Cgroup));
    }

    #[test]
    fn test_prepare_fails_when_nothing_left() {
        let tmp = proc_root(&["net"]);
        let procfs = ProcFs::new(tmp.path());
        let mut config = ReportConfig::new().with_kind(NamespaceKind::Cgroup);

        assert!(prepare(&procfs, &mut config).is_err());
    }

    #[test]
    fn test_prepare_fails_without_procfs() {
        let procfs = ProcFs::new("/nonexistent/proc/root");
        let mut config = ReportConfig::new();

        let err = prepare(&procfs, &mut config).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/proc/root"));
    }
}
