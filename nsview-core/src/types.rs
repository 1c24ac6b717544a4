//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Number of rows kept from a `uid_map` / `gid_map` file
pub const MAP_LIMIT: usize = 5;

/// Process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ProcessId(i32);

impl ProcessId {
    /// The init process
    pub const INIT: Self = Self(1);

    /// Create from raw PID
    #[must_use]
    pub const fn from_raw(pid: i32) -> Self {
        Self(pid)
    }

    /// Get raw PID value
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Check if this is the init process
    #[must_use]
    pub const fn is_init(self) -> bool {
        self.0 == Self::INIT.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProcessId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().parse::<i32>() {
            Ok(pid) if pid > 0 => Ok(Self(pid)),
            _ => Err(Error::InvalidConfig {
                message: format!("invalid process id '{s}'"),
            }),
        }
    }
}

/// Kernel-assigned namespace identifier (the nsfs inode number)
///
/// Unique within a [`NamespaceKind`], not across kinds. The value `0` never
/// names a real namespace and stands for "unknown".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct NamespaceId(u64);

impl NamespaceId {
    /// Placeholder for an unknown namespace
    pub const UNKNOWN: Self = Self(0);

    /// Create from raw inode number
    #[must_use]
    pub const fn from_raw(nid: u64) -> Self {
        Self(nid)
    }

    /// Get raw inode number
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Check if this id names a real namespace
    #[must_use]
    pub const fn is_known(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NamespaceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().parse::<u64>() {
            Ok(nid) if nid > 0 => Ok(Self(nid)),
            _ => Err(Error::InvalidConfig {
                message: format!("invalid namespace id '{s}'"),
            }),
        }
    }
}

/// The seven Linux namespace kinds, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NamespaceKind {
    /// Control group root directory
    Cgroup,
    /// System V IPC and POSIX message queues
    Ipc,
    /// Mount points
    Mnt,
    /// Network devices, stacks and ports
    Net,
    /// Process ids
    Pid,
    /// User and group ids
    User,
    /// Hostname and NIS domain name
    Uts,
}

impl NamespaceKind {
    /// Number of kinds
    pub const COUNT: usize = 7;

    /// All kinds in reporting order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Cgroup,
        Self::Ipc,
        Self::Mnt,
        Self::Net,
        Self::Pid,
        Self::User,
        Self::Uts,
    ];

    /// Position in [`Self::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Upper-case display name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cgroup => "CGROUP",
            Self::Ipc => "IPC",
            Self::Mnt => "MNT",
            Self::Net => "NET",
            Self::Pid => "PID",
            Self::User => "USER",
            Self::Uts => "UTS",
        }
    }

    /// File name under `/proc/<pid>/ns/`
    #[must_use]
    pub const fn proc_name(self) -> &'static str {
        match self {
            Self::Cgroup => "cgroup",
            Self::Ipc => "ipc",
            Self::Mnt => "mnt",
            Self::Net => "net",
            Self::Pid => "pid",
            Self::User => "user",
            Self::Uts => "uts",
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamespaceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidConfig {
                message: format!(
                    "unrecognized namespace kind '{s}' (expected one of: IPC, MNT, NET, PID, USER, UTS, CGROUP)"
                ),
            })
    }
}

/// Set of namespace kinds for bitwise operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindSet(u8);

impl KindSet {
    /// All kinds
    pub const ALL: Self = Self(0b0111_1111);
    /// No kinds
    pub const NONE: Self = Self(0);

    /// Set containing a single kind
    #[must_use]
    pub const fn only(kind: NamespaceKind) -> Self {
        Self(1 << kind.index())
    }

    /// Check if kind is in the set
    #[must_use]
    pub const fn contains(self, kind: NamespaceKind) -> bool {
        self.0 & Self::only(kind).0 != 0
    }

    /// Add a kind
    pub const fn insert(&mut self, kind: NamespaceKind) {
        self.0 |= Self::only(kind).0;
    }

    /// Remove a kind
    pub const fn remove(&mut self, kind: NamespaceKind) {
        self.0 &= !Self::only(kind).0;
    }

    /// Kinds in `self` but not in `other`
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Check if the set is empty
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of kinds in the set
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the kinds in reporting order
    pub fn iter(self) -> impl Iterator<Item = NamespaceKind> {
        NamespaceKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl Default for KindSet {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<NamespaceKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = NamespaceKind>>(iter: I) -> Self {
        let mut set = Self::NONE;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<NamespaceKind> for KindSet {
    fn from(kind: NamespaceKind) -> Self {
        Self::only(kind)
    }
}

impl std::ops::BitOr for KindSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for KindSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(NamespaceKind::as_str).collect();
        f.write_str(&names.join(","))
    }
}

/// One row of a `uid_map` or `gid_map` file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapEntry {
    /// First id inside the user namespace
    pub inside: u32,
    /// First id outside the user namespace
    pub outside: u32,
    /// Length of the mapped range
    pub length: u32,
}

impl IdMapEntry {
    /// Create a mapping row
    #[must_use]
    pub const fn new(inside: u32, outside: u32, length: u32) -> Self {
        Self {
            inside,
            outside,
            length,
        }
    }

    /// Check if the row maps any id
    #[must_use]
    pub const fn is_used(&self) -> bool {
        self.length > 0
    }
}

impl fmt::Display for IdMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.inside, self.outside, self.length)
    }
}

/// Bounded id mapping table of a user namespace
///
/// Holds at most [`MAP_LIMIT`] rows; unfilled slots stay zeroed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<IdMapEntry>", from = "Vec<IdMapEntry>")]
pub struct IdMap {
    slots: [IdMapEntry; MAP_LIMIT],
    len: usize,
}

impl IdMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row, returning `false` once all slots are filled
    pub fn push(&mut self, entry: IdMapEntry) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[self.len] = entry;
        self.len += 1;
        true
    }

    /// Number of filled rows
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if no row was filled
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if every slot is filled
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == MAP_LIMIT
    }

    /// All slots, filled or not
    #[must_use]
    pub const fn slots(&self) -> &[IdMapEntry; MAP_LIMIT] {
        &self.slots
    }

    /// Iterate the filled rows
    pub fn iter(&self) -> impl Iterator<Item = &IdMapEntry> {
        self.slots[..self.len].iter()
    }
}

impl FromIterator<IdMapEntry> for IdMap {
    fn from_iter<I: IntoIterator<Item = IdMapEntry>>(iter: I) -> Self {
        let mut map = Self::new();
        for entry in iter {
            if !map.push(entry) {
                break;
            }
        }
        map
    }
}

impl From<Vec<IdMapEntry>> for IdMap {
    fn from(entries: Vec<IdMapEntry>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<IdMap> for Vec<IdMapEntry> {
    fn from(map: IdMap) -> Self {
        map.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id() {
        let pid = ProcessId::from_raw(123);
        assert_eq!(pid.as_raw(), 123);
        assert!(!pid.is_init());
        assert!(ProcessId::INIT.is_init());
        assert_eq!(pid.to_string(), "123");
    }

    #[test]
    fn test_process_id_parse() {
        assert_eq!("42".parse::<ProcessId>().unwrap(), ProcessId::from_raw(42));
        assert!("0".parse::<ProcessId>().is_err());
        assert!("-3".parse::<ProcessId>().is_err());
        assert!("abc".parse::<ProcessId>().is_err());
    }

    #[test]
    fn test_namespace_id_unknown() {
        assert!(!NamespaceId::UNKNOWN.is_known());
        assert!(NamespaceId::from_raw(4_026_531_836).is_known());
        assert_eq!(NamespaceId::default(), NamespaceId::UNKNOWN);
        assert!("0".parse::<NamespaceId>().is_err());
    }

    #[test]
    fn test_kind_order_and_index() {
        for (i, kind) in NamespaceKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert_eq!(NamespaceKind::ALL[0], NamespaceKind::Cgroup);
        assert_eq!(NamespaceKind::ALL[6], NamespaceKind::Uts);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("NET".parse::<NamespaceKind>().unwrap(), NamespaceKind::Net);
        assert_eq!("user".parse::<NamespaceKind>().unwrap(), NamespaceKind::User);
        assert_eq!(
            " Cgroup ".parse::<NamespaceKind>().unwrap(),
            NamespaceKind::Cgroup
        );
        assert!("TIME".parse::<NamespaceKind>().is_err());
    }

    #[test]
    fn test_kind_serde() {
        let json = serde_json::to_string(&NamespaceKind::Mnt).unwrap();
        assert_eq!(json, "\"MNT\"");
    }

    #[test]
    fn test_kind_set() {
        let mut set = KindSet::only(NamespaceKind::Pid) | KindSet::only(NamespaceKind::Net);
        assert!(set.contains(NamespaceKind::Pid));
        assert!(set.contains(NamespaceKind::Net));
        assert!(!set.contains(NamespaceKind::Mnt));
        assert_eq!(set.len(), 2);

        set.remove(NamespaceKind::Pid);
        assert!(!set.contains(NamespaceKind::Pid));

        let ordered: Vec<_> = KindSet::ALL.iter().collect();
        assert_eq!(ordered, NamespaceKind::ALL.to_vec());
        assert_eq!(KindSet::ALL.len(), NamespaceKind::COUNT);
        assert!(KindSet::NONE.is_empty());
    }

    #[test]
    fn test_kind_set_display() {
        let set: KindSet = [NamespaceKind::Uts, NamespaceKind::Ipc].into_iter().collect();
        assert_eq!(set.to_string(), "IPC,UTS");
    }

    #[test]
    fn test_id_map_bounded() {
        let mut map = IdMap::new();
        for i in 0..MAP_LIMIT as u32 {
            assert!(map.push(IdMapEntry::new(i, 1000 + i, 1)));
        }
        assert!(map.is_full());
        assert!(!map.push(IdMapEntry::new(9, 9, 9)));
        assert_eq!(map.len(), MAP_LIMIT);
    }

    #[test]
    fn test_id_map_partial_slots() {
        let map: IdMap = vec![IdMapEntry::new(0, 1000, 1), IdMapEntry::new(1, 1001, 99_999)].into();

        assert_eq!(map.len(), 2);
        assert_eq!(map.slots()[1], IdMapEntry::new(1, 1001, 99_999));
        assert!(map.slots()[2..].iter().all(|e| *e == IdMapEntry::default()));
        assert!(map.slots()[2..].iter().all(|e| !e.is_used()));
    }

    #[test]
    fn test_id_map_serializes_filled_rows() {
        let map: IdMap = vec![IdMapEntry::new(0, 0, 4_294_967_295)].into();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"[{"inside":0,"outside":0,"length":4294967295}]"#);

        let back: IdMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
