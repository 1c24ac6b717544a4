//! procfs-backed [`NamespaceSource`]
//!
//! Layout read under the proc root:
//! - `<pid>/status`: the `PPid:` line
//! - `<pid>/comm`: command name
//! - `<pid>` directory owner: uid and gid of the process
//! - `<pid>/ns/<kind>`: a `kind:[inode]` link; the inode is the namespace id
//! - `<pid>/uid_map`, `<pid>/gid_map`: user namespace id mappings

use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use nsview_core::{
    Error, IdMap, IdMapEntry, KindSet, MAP_LIMIT, NamespaceId, NamespaceKind, ProcessId, Result,
};

use crate::config::DEFAULT_PROC_ROOT;
use crate::source::{NamespaceSource, ProcessInfo};

/// Reads process and namespace facts from a procfs mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFs {
    /// Create a reader for the procfs mounted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The proc root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if the proc root can be listed
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        fs::read_dir(&self.root).is_ok()
    }

    /// Kinds the running kernel exposes under `self/ns`
    #[must_use]
    pub fn supported_kinds(&self) -> KindSet {
        let ns_dir = self.root.join("self").join("ns");
        NamespaceKind::ALL
            .into_iter()
            .filter(|kind| fs::symlink_metadata(ns_dir.join(kind.proc_name())).is_ok())
            .collect()
    }

    fn process_dir(&self, pid: ProcessId) -> PathBuf {
        self.root.join(pid.to_string())
    }

    fn read_process(&self, pid: ProcessId) -> Result<ProcessInfo> {
        let dir = self.process_dir(pid);

        let status = fs::read_to_string(dir.join("status"))
            .map_err(|e| Error::source_unavailable(pid, "status", &e))?;
        let ppid = parse_status_ppid(&status).ok_or_else(|| Error::SourceUnavailable {
            pid,
            what: "status".to_string(),
            message: "no PPid line".to_string(),
        })?;

        let name = fs::read_to_string(dir.join("comm"))
            .map_err(|e| Error::source_unavailable(pid, "comm", &e))?;

        let meta = fs::metadata(&dir).map_err(|e| Error::source_unavailable(pid, "owner", &e))?;

        Ok(ProcessInfo::new(pid, ppid, name.trim()).with_owner(meta.uid(), meta.gid()))
    }

    fn read_map(&self, pid: ProcessId, file: &str) -> Result<IdMap> {
        let content = fs::read_to_string(self.process_dir(pid).join(file))
            .map_err(|e| Error::source_unavailable(pid, file, &e))?;
        Ok(parse_id_map(&content))
    }
}

impl NamespaceSource for ProcFs {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        let entries = fs::read_dir(&self.root).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => Error::PermissionDenied {
                operation: format!("list {}", self.root.display()),
            },
            _ => Error::Io(e),
        })?;

        let mut processes = Vec::new();
        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .filter(|name| name.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|name| name.parse::<ProcessId>().ok())
            else {
                continue;
            };

            // processes exit while we scan
            match self.read_process(pid) {
                Ok(info) => {
                    processes.try_reserve(1)?;
                    processes.push(info);
                }
                Err(e) => debug!(pid = %pid, error = %e, "Skipping process"),
            }
        }

        debug!(root = %self.root.display(), count = processes.len(), "Scanned procfs");
        Ok(processes)
    }

    fn namespace_id(&self, pid: ProcessId, kind: NamespaceKind) -> Result<NamespaceId> {
        let what = format!("ns/{}", kind.proc_name());
        let path = self.process_dir(pid).join(&what);

        if let Some(nid) = fs::read_link(&path)
            .ok()
            .and_then(|target| parse_ns_link(&target.to_string_lossy(), kind))
        {
            trace!(pid = %pid, kind = %kind, nid = %nid, "Resolved namespace link");
            return Ok(nid);
        }

        let meta = fs::metadata(&path).map_err(|e| Error::source_unavailable(pid, &what, &e))?;
        Ok(NamespaceId::from_raw(meta.ino()))
    }

    fn uid_map(&self, pid: ProcessId) -> Result<IdMap> {
        self.read_map(pid, "uid_map")
    }

    fn gid_map(&self, pid: ProcessId) -> Result<IdMap> {
        self.read_map(pid, "gid_map")
    }
}

/// Parent pid from the content of a `status` file
#[must_use]
pub fn parse_status_ppid(status: &str) -> Option<ProcessId> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("PPid:"))
        .and_then(|value| value.trim().parse::<i32>().ok())
        .map(ProcessId::from_raw)
}

/// Namespace id from an `ns/<kind>` link target such as `net:[4026531840]`
#[must_use]
pub fn parse_ns_link(target: &str, kind: NamespaceKind) -> Option<NamespaceId> {
    target
        .strip_prefix(kind.proc_name())?
        .strip_prefix(":[")?
        .strip_suffix(']')?
        .parse::<u64>()
        .ok()
        .map(NamespaceId::from_raw)
}

/// Mapping rows from the content of a `uid_map` or `gid_map` file
///
/// Reads at most [`MAP_LIMIT`] rows and stops at the first blank or
/// malformed line.
#[must_use]
pub fn parse_id_map(content: &str) -> IdMap {
    content
        .lines()
        .map_while(|line| {
            let mut fields = line.split_whitespace().map(str::parse::<u32>);
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(Ok(inside)), Some(Ok(outside)), Some(Ok(length)), None) => {
                    Some(IdMapEntry::new(inside, outside, length))
                }
                _ => None,
            }
        })
        .take(MAP_LIMIT)
        .collect()
}
