//! Process records and the registry that owns them

use serde::Serialize;
use std::collections::HashMap;

use nsview_core::{Error, NamespaceId, NamespaceKind, ProcessId, Result};

use crate::source::ProcessInfo;

/// A discovered process
///
/// The parent and namespace links are keys into the owning
/// [`ProcessRegistry`] and [`NamespaceDirectory`](crate::NamespaceDirectory);
/// they are filled in once by the topology build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pid: ProcessId,
    ppid: ProcessId,
    uid: u32,
    gid: u32,
    name: String,
    #[serde(skip)]
    parent: Option<ProcessId>,
    #[serde(skip)]
    namespaces: [Option<NamespaceId>; NamespaceKind::COUNT],
}

impl Process {
    /// Create an unlinked process from raw facts
    #[must_use]
    pub fn new(info: ProcessInfo) -> Self {
        Self {
            pid: info.pid,
            ppid: info.ppid,
            uid: info.uid,
            gid: info.gid,
            name: info.name,
            parent: None,
            namespaces: [None; NamespaceKind::COUNT],
        }
    }

    /// Process id
    #[must_use]
    pub const fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Parent process id as reported by the kernel
    #[must_use]
    pub const fn ppid(&self) -> ProcessId {
        self.ppid
    }

    /// Owner user id
    #[must_use]
    pub const fn uid(&self) -> u32 {
        self.uid
    }

    /// Owner group id
    #[must_use]
    pub const fn gid(&self) -> u32 {
        self.gid
    }

    /// Command name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent process, if it was present in the registry
    #[must_use]
    pub const fn parent(&self) -> Option<ProcessId> {
        self.parent
    }

    /// Namespace of the given kind, if it could be resolved
    #[must_use]
    pub const fn namespace(&self, kind: NamespaceKind) -> Option<NamespaceId> {
        self.namespaces[kind.index()]
    }

    pub(crate) const fn set_parent(&mut self, parent: Option<ProcessId>) {
        self.parent = parent;
    }

    pub(crate) const fn set_namespace(&mut self, kind: NamespaceKind, nid: Option<NamespaceId>) {
        self.namespaces[kind.index()] = nid;
    }
}

impl From<ProcessInfo> for Process {
    fn from(info: ProcessInfo) -> Self {
        Self::new(info)
    }
}

/// Owning collection of discovered processes
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    processes: Vec<Process>,
    index: HashMap<ProcessId, usize>,
}

impl ProcessRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from raw process facts
    ///
    /// # Errors
    /// Fails on a duplicated pid or when the registry cannot grow
    pub fn from_infos(infos: impl IntoIterator<Item = ProcessInfo>) -> Result<Self> {
        let mut registry = Self::new();
        for info in infos {
            registry.insert(Process::new(info))?;
        }
        Ok(registry)
    }

    /// Append a process
    ///
    /// # Errors
    /// Returns [`Error::DuplicateProcess`] if the pid is already registered
    pub fn insert(&mut self, process: Process) -> Result<()> {
        if self.index.contains_key(&process.pid) {
            return Err(Error::DuplicateProcess { pid: process.pid });
        }

        self.processes.try_reserve(1)?;
        self.index.try_reserve(1)?;

        self.index.insert(process.pid, self.processes.len());
        self.processes.push(process);
        Ok(())
    }

    /// Look up a process by pid
    #[must_use]
    pub fn find_by_pid(&self, pid: ProcessId) -> Option<&Process> {
        self.index.get(&pid).map(|&i| &self.processes[i])
    }

    /// Reorder by ascending pid
    pub fn sort_by_pid(&mut self) {
        if self.is_sorted() {
            return;
        }
        self.processes.sort_by_key(Process::pid);
        self.index = self
            .processes
            .iter()
            .enumerate()
            .map(|(i, p)| (p.pid, i))
            .collect();
    }

    /// Check if the processes are in ascending pid order
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.processes.is_sorted_by_key(Process::pid)
    }

    /// Number of processes
    #[must_use]
    pub fn count(&self) -> usize {
        self.processes.len()
    }

    /// Check if the registry holds no process
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Iterate in the current order
    pub fn iter(&self) -> std::slice::Iter<'_, Process> {
        self.processes.iter()
    }

    pub(crate) fn get(&self, position: usize) -> &Process {
        &self.processes[position]
    }

    pub(crate) fn get_mut(&mut self, position: usize) -> &mut Process {
        &mut self.processes[position]
    }

    pub(crate) fn position(&self, pid: ProcessId) -> Option<usize> {
        self.index.get(&pid).copied()
    }
}

impl<'a> IntoIterator for &'a ProcessRegistry {
    type Item = &'a Process;
    type IntoIter = std::slice::Iter<'a, Process>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
