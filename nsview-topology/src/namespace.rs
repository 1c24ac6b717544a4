//! Namespace records and the per-kind directory that owns them

use serde::Serialize;
use std::collections::HashMap;

use nsview_core::{Error, IdMap, NamespaceId, NamespaceKind, ProcessId, Result};

/// A discovered namespace
///
/// Created once per distinct `(kind, nid)`, the first time a process
/// resolves to it; later processes only join the member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
    kind: NamespaceKind,
    nid: NamespaceId,
    pnid: NamespaceId,
    creator_pid: ProcessId,
    members: Vec<ProcessId>,
    uid_map: IdMap,
    gid_map: IdMap,
}

impl Namespace {
    /// Create a namespace first seen in process `creator_pid`
    #[must_use]
    pub fn new(kind: NamespaceKind, nid: NamespaceId, creator_pid: ProcessId) -> Self {
        Self {
            kind,
            nid,
            pnid: NamespaceId::UNKNOWN,
            creator_pid,
            members: Vec::new(),
            uid_map: IdMap::new(),
            gid_map: IdMap::new(),
        }
    }

    /// Set the id of the same-kind namespace of the creator's parent
    #[must_use]
    pub fn with_parent(mut self, pnid: NamespaceId) -> Self {
        self.pnid = pnid;
        self
    }

    /// Set the UID and GID mapping tables
    #[must_use]
    pub fn with_id_maps(mut self, uid_map: IdMap, gid_map: IdMap) -> Self {
        self.uid_map = uid_map;
        self.gid_map = gid_map;
        self
    }

    /// Namespace kind
    #[must_use]
    pub const fn kind(&self) -> NamespaceKind {
        self.kind
    }

    /// Namespace id
    #[must_use]
    pub const fn nid(&self) -> NamespaceId {
        self.nid
    }

    /// Parent namespace id, [`NamespaceId::UNKNOWN`] if unknown
    #[must_use]
    pub const fn pnid(&self) -> NamespaceId {
        self.pnid
    }

    /// Pid of the process the namespace was first seen in
    #[must_use]
    pub const fn creator_pid(&self) -> ProcessId {
        self.creator_pid
    }

    /// Member processes in discovery order
    #[must_use]
    pub fn members(&self) -> &[ProcessId] {
        &self.members
    }

    /// UID mapping table (USER namespaces only)
    #[must_use]
    pub const fn uid_map(&self) -> &IdMap {
        &self.uid_map
    }

    /// GID mapping table (USER namespaces only)
    #[must_use]
    pub const fn gid_map(&self) -> &IdMap {
        &self.gid_map
    }

    /// Check if the namespace has no resolvable parent
    ///
    /// Namespaces first seen in init are never orphaned, even though their
    /// parent id is unknown.
    #[must_use]
    pub const fn is_orphaned(&self) -> bool {
        !self.pnid.is_known() && !self.creator_pid.is_init()
    }

    pub(crate) fn add_member(&mut self, pid: ProcessId) -> Result<()> {
        self.members.try_reserve(1)?;
        self.members.push(pid);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct KindRecords {
    records: Vec<Namespace>,
    index: HashMap<NamespaceId, usize>,
}

/// Owning collection of namespace records, grouped by kind
#[derive(Debug, Default)]
pub struct NamespaceDirectory {
    kinds: [KindRecords; NamespaceKind::COUNT],
}

impl NamespaceDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace
    ///
    /// # Errors
    /// Returns [`Error::DuplicateNamespace`] if `(kind, nid)` is already known
    pub fn insert(&mut self, namespace: Namespace) -> Result<()> {
        let kind = namespace.kind;
        let nid = namespace.nid;
        let entry = &mut self.kinds[kind.index()];

        if entry.index.contains_key(&nid) {
            return Err(Error::DuplicateNamespace { kind, nid });
        }

        entry.records.try_reserve(1)?;
        entry.index.try_reserve(1)?;

        entry.index.insert(nid, entry.records.len());
        entry.records.push(namespace);
        Ok(())
    }

    /// Look up a namespace by kind and id
    #[must_use]
    pub fn get(&self, kind: NamespaceKind, nid: NamespaceId) -> Option<&Namespace> {
        let entry = &self.kinds[kind.index()];
        entry.index.get(&nid).map(|&i| &entry.records[i])
    }

    pub(crate) fn get_mut(&mut self, kind: NamespaceKind, nid: NamespaceId) -> Option<&mut Namespace> {
        let entry = &mut self.kinds[kind.index()];
        let position = *entry.index.get(&nid)?;
        Some(&mut entry.records[position])
    }

    /// Check if `(kind, nid)` is known
    #[must_use]
    pub fn contains(&self, kind: NamespaceKind, nid: NamespaceId) -> bool {
        self.kinds[kind.index()].index.contains_key(&nid)
    }

    /// Namespaces of one kind in discovery order
    pub fn iter(&self, kind: NamespaceKind) -> std::slice::Iter<'_, Namespace> {
        self.kinds[kind.index()].records.iter()
    }

    /// Number of namespaces of one kind
    #[must_use]
    pub fn count(&self, kind: NamespaceKind) -> usize {
        self.kinds[kind.index()].records.len()
    }

    /// Number of namespaces across all kinds
    #[must_use]
    pub fn total(&self) -> usize {
        self.kinds.iter().map(|k| k.records.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nid(raw: u64) -> NamespaceId {
        NamespaceId::from_raw(raw)
    }

    #[test]
    fn test_orphan_rule() {
        let init = ProcessId::INIT;
        let other = ProcessId::from_raw(50);

        assert!(!Namespace::new(NamespaceKind::Pid, nid(1), init).is_orphaned());
        assert!(Namespace::new(NamespaceKind::Net, nid(7), other).is_orphaned());
        assert!(
            !Namespace::new(NamespaceKind::Net, nid(7), other)
                .with_parent(nid(3))
                .is_orphaned()
        );
        // a parent id counts even if no such namespace was ever seen
        assert!(
            !Namespace::new(NamespaceKind::Net, nid(7), other)
                .with_parent(nid(123_456))
                .is_orphaned()
        );
    }

    #[test]
    fn test_directory_insert_and_get() {
        let mut dir = NamespaceDirectory::new();
        dir.insert(Namespace::new(NamespaceKind::Pid, nid(100), ProcessId::INIT))
            .unwrap();
        // same id under another kind is a different namespace
        dir.insert(Namespace::new(NamespaceKind::Net, nid(100), ProcessId::INIT))
            .unwrap();

        assert_eq!(dir.count(NamespaceKind::Pid), 1);
        assert_eq!(dir.count(NamespaceKind::Net), 1);
        assert_eq!(dir.total(), 2);
        assert!(dir.contains(NamespaceKind::Pid, nid(100)));
        assert!(dir.get(NamespaceKind::Mnt, nid(100)).is_none());
    }

    #[test]
    fn test_directory_rejects_duplicates() {
        let mut dir = NamespaceDirectory::new();
        dir.insert(Namespace::new(NamespaceKind::Uts, nid(9), ProcessId::INIT))
            .unwrap();

        let err = dir
            .insert(Namespace::new(NamespaceKind::Uts, nid(9), ProcessId::from_raw(2)))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateNamespace { .. }));
        assert_eq!(
            dir.get(NamespaceKind::Uts, nid(9)).unwrap().creator_pid(),
            ProcessId::INIT
        );
    }

    #[test]
    fn test_members_keep_order() {
        let mut dir = NamespaceDirectory::new();
        dir.insert(Namespace::new(NamespaceKind::Ipc, nid(4), ProcessId::INIT))
            .unwrap();

        let ns = dir.get_mut(NamespaceKind::Ipc, nid(4)).unwrap();
        for pid in [1, 7, 3] {
            ns.add_member(ProcessId::from_raw(pid)).unwrap();
        }

        let members: Vec<i32> = dir
            .get(NamespaceKind::Ipc, nid(4))
            .unwrap()
            .members()
            .iter()
            .map(|p| p.as_raw())
            .collect();
        assert_eq!(members, vec![1, 7, 3]);
    }
}
