//! Lookups and reports over a built [`Topology`]

use serde::{Deserialize, Serialize};

use nsview_core::{Error, KindSet, NamespaceId, NamespaceKind, ProcessId, Result};

use crate::assembler::Topology;
use crate::forest::{ForestReport, NamespaceForest};
use crate::namespace::{Namespace, NamespaceDirectory};
use crate::process::{Process, ProcessRegistry};

/// How much of the forest a process query covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessScope {
    /// Only the namespace the process belongs to
    #[default]
    Own,
    /// The process's namespace and every namespace below it
    Descendants,
}

impl ProcessScope {
    /// Scope for a descendants flag
    #[must_use]
    pub const fn from_descendants(descendants: bool) -> Self {
        if descendants { Self::Descendants } else { Self::Own }
    }
}

impl Topology {
    /// All processes, in ascending pid order
    #[must_use]
    pub const fn processes(&self) -> &ProcessRegistry {
        &self.processes
    }

    /// All namespace records
    #[must_use]
    pub const fn directory(&self) -> &NamespaceDirectory {
        &self.directory
    }

    /// Forest of one kind
    #[must_use]
    pub const fn forest(&self, kind: NamespaceKind) -> &NamespaceForest {
        &self.forests[kind.index()]
    }

    /// Namespace of a given kind and id
    #[must_use]
    pub fn namespace(&self, kind: NamespaceKind, nid: NamespaceId) -> Option<&Namespace> {
        self.directory.get(kind, nid)
    }

    /// First namespace with id `nid`, searching kinds in reporting order
    ///
    /// # Errors
    /// Returns [`Error::NamespaceNotFound`] if no kind has such a namespace
    pub fn namespace_by_id(&self, nid: NamespaceId) -> Result<&Namespace> {
        NamespaceKind::ALL
            .into_iter()
            .find_map(|kind| {
                let forest = self.forest(kind);
                forest
                    .find(nid)
                    .and_then(|node| self.directory.get(kind, forest.namespace(node)))
            })
            .ok_or(Error::NamespaceNotFound { nid })
    }

    /// Process with the given pid
    ///
    /// # Errors
    /// Returns [`Error::ProcessNotFound`] if no such process was collected
    pub fn process_by_pid(&self, pid: ProcessId) -> Result<&Process> {
        self.processes
            .find_by_pid(pid)
            .ok_or(Error::ProcessNotFound { pid })
    }

    /// Parent of a process, if it was collected
    #[must_use]
    pub fn parent(&self, process: &Process) -> Option<&Process> {
        process
            .parent()
            .and_then(|pid| self.processes.find_by_pid(pid))
    }

    /// Namespace of the given kind a process belongs to
    #[must_use]
    pub fn namespace_of(&self, process: &Process, kind: NamespaceKind) -> Option<&Namespace> {
        process
            .namespace(kind)
            .and_then(|nid| self.directory.get(kind, nid))
    }

    /// Process the namespace was first seen in, if it is still collected
    #[must_use]
    pub fn creator(&self, namespace: &Namespace) -> Option<&Process> {
        self.processes.find_by_pid(namespace.creator_pid())
    }

    /// Member processes in discovery order
    pub fn members<'a>(
        &'a self,
        namespace: &'a Namespace,
    ) -> impl Iterator<Item = &'a Process> + 'a {
        namespace
            .members()
            .iter()
            .filter_map(|&pid| self.processes.find_by_pid(pid))
    }

    /// Namespace of the same kind the creator's parent belonged to
    #[must_use]
    pub fn parent_namespace(&self, namespace: &Namespace) -> Option<&Namespace> {
        if !namespace.pnid().is_known() {
            return None;
        }
        self.directory.get(namespace.kind(), namespace.pnid())
    }

    /// User namespace owning `namespace`: the creator's user namespace
    #[must_use]
    pub fn owner_user_namespace(&self, namespace: &Namespace) -> Option<&Namespace> {
        self.creator(namespace)
            .and_then(|creator| self.namespace_of(creator, NamespaceKind::User))
    }

    /// Depth of a namespace in its forest
    #[must_use]
    pub fn depth_of(&self, namespace: &Namespace) -> Option<u32> {
        let forest = self.forest(namespace.kind());
        forest.find(namespace.nid()).map(|node| forest.depth(node))
    }

    /// Number of namespaces of one kind
    #[must_use]
    pub fn count(&self, kind: NamespaceKind) -> usize {
        self.directory.count(kind)
    }

    /// Full parented/orphaned report of every kind in `kinds`
    #[must_use]
    pub fn report(&self, kinds: KindSet) -> Vec<ForestReport> {
        kinds
            .iter()
            .map(|kind| {
                let forest = self.forest(kind);
                forest.report(forest.preorder(), &self.directory)
            })
            .collect()
    }

    /// Report of the namespaces a process belongs to
    ///
    /// Kinds the process could not be resolved for yield an empty report.
    ///
    /// # Errors
    /// Returns [`Error::ProcessNotFound`] if no such process was collected
    pub fn process_report(
        &self,
        pid: ProcessId,
        scope: ProcessScope,
        kinds: KindSet,
    ) -> Result<Vec<ForestReport>> {
        let process = self.process_by_pid(pid)?;

        let reports = kinds
            .iter()
            .map(|kind| {
                let forest = self.forest(kind);
                let Some(node) = process.namespace(kind).and_then(|nid| forest.find(nid)) else {
                    return ForestReport::empty(kind);
                };
                match scope {
                    ProcessScope::Own => forest.report_node(node, &self.directory),
                    ProcessScope::Descendants => {
                        forest.report(forest.subtree(node), &self.directory)
                    }
                }
            })
            .collect();

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSource;

    fn pid(raw: i32) -> ProcessId {
        ProcessId::from_raw(raw)
    }

    fn nid(raw: u64) -> NamespaceId {
        NamespaceId::from_raw(raw)
    }

    /// init (1) -> runc (10) -> container (11) -> worker (12), plus a
    /// stray process (50) whose parent is gone
    fn topology() -> Topology {
        let source = MockSource::new()
            .with_process(1, 0, "init")
            .with_process(10, 1, "runc")
            .with_process(11, 10, "container")
            .with_process(12, 11, "worker")
            .with_process(50, 49, "stray")
            .with_shared_namespaces(1, 1000)
            .with_shared_namespaces(10, 1000)
            .with_shared_namespaces(11, 2000)
            .with_shared_namespaces(12, 2000)
            .with_namespace(12, NamespaceKind::Net, 3000)
            .with_namespace(50, NamespaceKind::Net, 7);

        Topology::collect(&source).unwrap()
    }

    #[test]
    fn test_namespace_by_id_scans_kinds_in_order() {
        let topology = topology();

        let ns = topology.namespace_by_id(nid(2000)).unwrap();
        assert_eq!(ns.kind(), NamespaceKind::Cgroup);
        assert_eq!(ns.creator_pid(), pid(11));

        let ns = topology.namespace_by_id(nid(7)).unwrap();
        assert_eq!(ns.kind(), NamespaceKind::Net);
    }

    #[test]
    fn test_namespace_by_id_not_found() {
        let err = topology().namespace_by_id(nid(999)).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "No such namespace: 999");
    }

    #[test]
    fn test_process_by_pid() {
        let topology = topology();
        assert_eq!(topology.process_by_pid(pid(11)).unwrap().name(), "container");

        let err = topology.process_by_pid(pid(4242)).unwrap_err();
        assert!(matches!(err, Error::ProcessNotFound { .. }));
    }

    #[test]
    fn test_relations() {
        let topology = topology();
        let worker = topology.process_by_pid(pid(12)).unwrap();

        assert_eq!(topology.parent(worker).unwrap().pid(), pid(11));

        let net = topology.namespace_of(worker, NamespaceKind::Net).unwrap();
        assert_eq!(net.nid(), nid(3000));
        assert_eq!(topology.creator(net).unwrap().pid(), pid(12));
        assert_eq!(topology.parent_namespace(net).unwrap().nid(), nid(2000));
        assert_eq!(topology.owner_user_namespace(net).unwrap().nid(), nid(2000));
        assert_eq!(topology.depth_of(net), Some(2));

        let pid_ns = topology.namespace(NamespaceKind::Pid, nid(2000)).unwrap();
        let members: Vec<&str> = topology.members(pid_ns).map(Process::name).collect();
        assert_eq!(members, vec!["container", "worker"]);
    }

    #[test]
    fn test_full_report_partitions_each_kind() {
        let topology = topology();

        let reports = topology.report(KindSet::ALL);
        assert_eq!(reports.len(), NamespaceKind::COUNT);

        let net = &reports[NamespaceKind::Net.index()];
        assert_eq!(net.kind, NamespaceKind::Net);
        let parented: Vec<u64> = net.parented.iter().map(|e| e.nid.as_raw()).collect();
        let orphaned: Vec<u64> = net.orphaned.iter().map(|e| e.nid.as_raw()).collect();
        assert_eq!(parented, vec![1000, 2000, 3000]);
        assert_eq!(orphaned, vec![7]);

        for report in &reports {
            assert_eq!(report.len(), topology.count(report.kind));
        }
    }

    #[test]
    fn test_report_respects_kind_selection() {
        let reports = topology().report(NamespaceKind::Uts.into());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, NamespaceKind::Uts);
    }

    #[test]
    fn test_process_report_own() {
        let topology = topology();

        let reports = topology
            .process_report(pid(11), ProcessScope::Own, NamespaceKind::Net.into())
            .unwrap();

        assert_eq!(reports.len(), 1);
        let entries: Vec<_> = reports[0].entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].nid, nid(2000));
        assert_eq!(reports[0].relative_depth(entries[0]), 0);
    }

    #[test]
    fn test_process_report_descendants() {
        let topology = topology();

        let reports = topology
            .process_report(pid(10), ProcessScope::Descendants, NamespaceKind::Net.into())
            .unwrap();

        let report = &reports[0];
        let nids: Vec<u64> = report.entries().map(|e| e.nid.as_raw()).collect();
        // orphans hang under the root, so the root's subtree holds them too
        assert_eq!(nids, vec![1000, 2000, 3000, 7]);
        assert_eq!(report.base_depth, 0);

        let reports = topology
            .process_report(pid(11), ProcessScope::Descendants, NamespaceKind::Net.into())
            .unwrap();
        let nids: Vec<u64> = reports[0].entries().map(|e| e.nid.as_raw()).collect();
        assert_eq!(nids, vec![2000, 3000]);
        let depths: Vec<u32> = reports[0]
            .entries()
            .map(|e| reports[0].relative_depth(e))
            .collect();
        assert_eq!(depths, vec![0, 1]);
    }

    #[test]
    fn test_process_report_own_orphan() {
        let reports = topology()
            .process_report(pid(50), ProcessScope::Own, NamespaceKind::Net.into())
            .unwrap();

        assert!(reports[0].parented.is_empty());
        assert_eq!(reports[0].orphaned.len(), 1);
        assert_eq!(reports[0].orphaned[0].nid, nid(7));
    }

    #[test]
    fn test_process_report_unresolved_kind_is_empty() {
        let reports = topology()
            .process_report(pid(50), ProcessScope::Descendants, NamespaceKind::Pid.into())
            .unwrap();
        assert!(reports[0].is_empty());
    }

    #[test]
    fn test_scope_from_flag() {
        assert_eq!(ProcessScope::from_descendants(true), ProcessScope::Descendants);
        assert_eq!(ProcessScope::from_descendants(false), ProcessScope::Own);
    }
}
