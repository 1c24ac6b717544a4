//! Source trait for the raw facts the topology is built from

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use nsview_core::{Error, IdMap, IdMapEntry, NamespaceId, NamespaceKind, ProcessId, Result};

/// Raw facts about one live process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process id
    pub pid: ProcessId,
    /// Parent process id
    pub ppid: ProcessId,
    /// Owner user id
    pub uid: u32,
    /// Owner group id
    pub gid: u32,
    /// Command name
    pub name: String,
}

impl ProcessInfo {
    /// Facts for a root-owned process
    #[must_use]
    pub fn new(pid: ProcessId, ppid: ProcessId, name: impl Into<String>) -> Self {
        Self {
            pid,
            ppid,
            uid: 0,
            gid: 0,
            name: name.into(),
        }
    }

    /// Set the owner
    #[must_use]
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }
}

/// Trait for the providers of process and namespace facts
///
/// This allows for different implementations:
/// - [`ProcFs`](crate::ProcFs) - Production procfs reader
/// - [`MockSource`] - Testing without procfs
///
/// Failures of [`namespace_id`](Self::namespace_id) and the map readers
/// concern one process only; the topology build records them as unresolved
/// and carries on.
pub trait NamespaceSource: Send + Sync {
    /// Snapshot of the live processes
    ///
    /// # Errors
    /// Returns error if the process list cannot be read at all
    fn processes(&self) -> Result<Vec<ProcessInfo>>;

    /// Namespace of the given kind the process belongs to
    ///
    /// # Errors
    /// Returns error if the kernel does not expose the kind, the process is
    /// gone, or access is denied
    fn namespace_id(&self, pid: ProcessId, kind: NamespaceKind) -> Result<NamespaceId>;

    /// UID mapping of the process's user namespace
    ///
    /// # Errors
    /// Returns error if the map cannot be read
    fn uid_map(&self, pid: ProcessId) -> Result<IdMap>;

    /// GID mapping of the process's user namespace
    ///
    /// # Errors
    /// Returns error if the map cannot be read
    fn gid_map(&self, pid: ProcessId) -> Result<IdMap>;
}

/// In-memory source for testing (doesn't touch procfs)
///
/// # Example
/// ```
/// use nsview_topology::{MockSource, NamespaceSource, NamespaceKind};
///
/// let source = MockSource::new()
///     .with_process(1, 0, "init")
///     .with_namespace(1, NamespaceKind::Pid, 4_026_531_836);
///
/// assert_eq!(source.processes().unwrap().len(), 1);
/// ```
#[derive(Default)]
pub struct MockSource {
    processes: Vec<ProcessInfo>,
    namespaces: HashMap<(ProcessId, NamespaceKind), NamespaceId>,
    uid_maps: HashMap<ProcessId, IdMap>,
    gid_maps: HashMap<ProcessId, IdMap>,
    namespace_reads: AtomicUsize,
    map_reads: AtomicUsize,
}

impl MockSource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root-owned process
    #[must_use]
    pub fn with_process(mut self, pid: i32, ppid: i32, name: &str) -> Self {
        self.processes.push(ProcessInfo::new(
            ProcessId::from_raw(pid),
            ProcessId::from_raw(ppid),
            name,
        ));
        self
    }

    /// Add a process from raw facts
    #[must_use]
    pub fn with_process_info(mut self, info: ProcessInfo) -> Self {
        self.processes.push(info);
        self
    }

    /// Resolve one kind of a process to `nid`
    #[must_use]
    pub fn with_namespace(mut self, pid: i32, kind: NamespaceKind, nid: u64) -> Self {
        self.namespaces.insert(
            (ProcessId::from_raw(pid), kind),
            NamespaceId::from_raw(nid),
        );
        self
    }

    /// Resolve every kind of a process to `nid`
    #[must_use]
    pub fn with_shared_namespaces(mut self, pid: i32, nid: u64) -> Self {
        for kind in NamespaceKind::ALL {
            self = self.with_namespace(pid, kind, nid);
        }
        self
    }

    /// Set the UID map rows of a process
    #[must_use]
    pub fn with_uid_map(mut self, pid: i32, rows: &[(u32, u32, u32)]) -> Self {
        self.uid_maps.insert(ProcessId::from_raw(pid), to_map(rows));
        self
    }

    /// Set the GID map rows of a process
    #[must_use]
    pub fn with_gid_map(mut self, pid: i32, rows: &[(u32, u32, u32)]) -> Self {
        self.gid_maps.insert(ProcessId::from_raw(pid), to_map(rows));
        self
    }

    /// Number of namespace id lookups served (for testing)
    pub fn namespace_reads(&self) -> usize {
        self.namespace_reads.load(Ordering::Relaxed)
    }

    /// Number of UID/GID map reads served (for testing)
    pub fn map_reads(&self) -> usize {
        self.map_reads.load(Ordering::Relaxed)
    }

    fn read_map(&self, maps: &HashMap<ProcessId, IdMap>, pid: ProcessId, what: &str) -> Result<IdMap> {
        self.map_reads.fetch_add(1, Ordering::Relaxed);

        maps.get(&pid).copied().ok_or_else(|| Error::SourceUnavailable {
            pid,
            what: what.to_string(),
            message: "no such file".to_string(),
        })
    }
}

fn to_map(rows: &[(u32, u32, u32)]) -> IdMap {
    rows.iter()
        .map(|&(inside, outside, length)| IdMapEntry::new(inside, outside, length))
        .collect()
}

impl std::fmt::Debug for MockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSource")
            .field("processes", &self.processes.len())
            .finish_non_exhaustive()
    }
}

impl NamespaceSource for MockSource {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        tracing::trace!(count = self.processes.len(), "Mock: Listed processes");
        Ok(self.processes.clone())
    }

    fn namespace_id(&self, pid: ProcessId, kind: NamespaceKind) -> Result<NamespaceId> {
        self.namespace_reads.fetch_add(1, Ordering::Relaxed);

        self.namespaces
            .get(&(pid, kind))
            .copied()
            .ok_or_else(|| Error::SourceUnavailable {
                pid,
                what: format!("ns/{}", kind.proc_name()),
                message: "no such file".to_string(),
            })
    }

    fn uid_map(&self, pid: ProcessId) -> Result<IdMap> {
        self.read_map(&self.uid_maps, pid, "uid_map")
    }

    fn gid_map(&self, pid: ProcessId) -> Result<IdMap> {
        self.read_map(&self.gid_maps, pid, "gid_map")
    }
}
