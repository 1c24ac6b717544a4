//! Topology assembly
//!
//! Walks the processes in ascending pid order and, for every namespace kind,
//! links each process to its namespace, creating the namespace record and
//! its forest node the first time an id is seen. Because parents usually
//! have lower pids than their children, a new namespace's parent id can be
//! read from the already-linked parent process.

use tracing::{debug, info};

use nsview_core::{Error, IdMap, NamespaceId, NamespaceKind, ProcessId, Result};

use crate::forest::NamespaceForest;
use crate::namespace::{Namespace, NamespaceDirectory};
use crate::process::ProcessRegistry;
use crate::source::NamespaceSource;

/// Point-in-time namespace topology
///
/// Built once, then queried; see the [`query`](crate::query) module for the
/// lookups and reports.
#[derive(Debug)]
pub struct Topology {
    pub(crate) processes: ProcessRegistry,
    pub(crate) directory: NamespaceDirectory,
    pub(crate) forests: [NamespaceForest; NamespaceKind::COUNT],
}

impl Topology {
    /// Enumerate the processes of `source` and build their topology
    ///
    /// # Errors
    /// Returns error if the process list cannot be read or the build fails
    pub fn collect<S: NamespaceSource + ?Sized>(source: &S) -> Result<Self> {
        let infos = source.processes()?;
        debug!(count = infos.len(), "Collected processes");

        let registry = ProcessRegistry::from_infos(infos)?;
        Self::build(registry, source)
    }

    /// Build the topology of an already collected process registry
    ///
    /// Failing to resolve one kind of one process leaves that slot empty and
    /// does not stop the build.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for an empty registry and
    /// [`Error::ResourceExhausted`] if memory runs out
    pub fn build<S: NamespaceSource + ?Sized>(
        mut processes: ProcessRegistry,
        source: &S,
    ) -> Result<Self> {
        if processes.is_empty() {
            return Err(Error::InvalidArgument {
                message: "no processes to build a topology from".to_string(),
            });
        }

        processes.sort_by_pid();

        let mut topology = Self {
            processes,
            directory: NamespaceDirectory::new(),
            forests: NamespaceKind::ALL.map(NamespaceForest::new),
        };

        for position in 0..topology.processes.count() {
            topology.link_process(position, source)?;
        }

        info!(
            processes = topology.processes.count(),
            namespaces = topology.directory.total(),
            "Topology built"
        );

        Ok(topology)
    }

    fn link_process<S: NamespaceSource + ?Sized>(
        &mut self,
        position: usize,
        source: &S,
    ) -> Result<()> {
        let process = self.processes.get(position);
        let pid = process.pid();
        let parent = self.processes.position(process.ppid());

        let parent_pid = parent.map(|p| self.processes.get(p).pid());
        self.processes.get_mut(position).set_parent(parent_pid);

        for kind in NamespaceKind::ALL {
            let nid = match source.namespace_id(pid, kind) {
                Ok(nid) if nid.is_known() => nid,
                Ok(_) => {
                    debug!(pid = %pid, kind = %kind, "Namespace id is zero, skipping");
                    continue;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(pid = %pid, kind = %kind, error = %e, "Namespace unresolved");
                    continue;
                }
            };

            self.processes.get_mut(position).set_namespace(kind, Some(nid));

            if let Some(existing) = self.directory.get_mut(kind, nid) {
                existing.add_member(pid)?;
                continue;
            }

            let pnid = parent
                .and_then(|p| self.processes.get(p).namespace(kind))
                .unwrap_or(NamespaceId::UNKNOWN);

            let mut namespace = Namespace::new(kind, nid, pid).with_parent(pnid);
            if kind == NamespaceKind::User {
                namespace = namespace.with_id_maps(
                    read_map(pid, "uid_map", source.uid_map(pid))?,
                    read_map(pid, "gid_map", source.gid_map(pid))?,
                );
            }
            namespace.add_member(pid)?;

            debug!(
                pid = %pid,
                kind = %kind,
                nid = %nid,
                pnid = %pnid,
                orphaned = namespace.is_orphaned(),
                "New namespace"
            );

            self.forests[kind.index()].insert(&namespace)?;
            self.directory.insert(namespace)?;
        }

        Ok(())
    }
}

/// A missing map is stored as empty; only fatal errors propagate
fn read_map(pid: ProcessId, what: &str, result: Result<IdMap>) -> Result<IdMap> {
    match result {
        Ok(map) => Ok(map),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!(pid = %pid, map = what, error = %e, "Id map unavailable");
            Ok(IdMap::new())
        }
    }
}
