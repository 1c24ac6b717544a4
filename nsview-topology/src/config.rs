//! Report configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use nsview_core::{Error, KindSet, NamespaceKind, Result};

/// Default procfs mount point
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// What to collect and how much of it to report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Mount point of procfs
    pub proc_root: PathBuf,

    /// Namespace kinds to report
    pub kinds: KindSet,

    /// List the member processes of every namespace
    pub show_members: bool,

    /// Print extended per-namespace information
    pub extended: bool,

    /// Process queries include the namespaces below the process's own
    pub descendants: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            kinds: KindSet::ALL,
            show_members: false,
            extended: false,
            descendants: false,
        }
    }
}

impl ReportConfig {
    /// Create a configuration reporting every kind from `/proc`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the procfs mount point
    #[must_use]
    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    /// Set the kinds to report
    #[must_use]
    pub fn with_kinds(mut self, kinds: KindSet) -> Self {
        self.kinds = kinds;
        self
    }

    /// Report a single kind
    #[must_use]
    pub fn with_kind(self, kind: NamespaceKind) -> Self {
        self.with_kinds(KindSet::only(kind))
    }

    /// List member processes
    #[must_use]
    pub fn with_members(mut self, enable: bool) -> Self {
        self.show_members = enable;
        self
    }

    /// Print extended information
    #[must_use]
    pub fn with_extended(mut self, enable: bool) -> Self {
        self.extended = enable;
        self
    }

    /// Include descendant namespaces in process queries
    #[must_use]
    pub fn with_descendants(mut self, enable: bool) -> Self {
        self.descendants = enable;
        self
    }

    /// Drop kinds the running kernel does not expose
    ///
    /// Returns the kinds that were removed.
    pub fn restrict_to(&mut self, supported: KindSet) -> KindSet {
        let removed = self.kinds.difference(supported);
        self.kinds = self.kinds & supported;
        removed
    }

    /// The procfs mount point
    #[must_use]
    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if no kind is selected or the proc
    /// root is empty
    pub fn validate(&self) -> Result<()> {
        if self.kinds.is_empty() {
            return Err(Error::InvalidConfig {
                message: "no namespace kind selected".to_string(),
            });
        }
        if self.proc_root.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "proc mount point is empty".to_string(),
            });
        }
        Ok(())
    }
}
