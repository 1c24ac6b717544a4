//! Error types for nsview

use thiserror::Error;

use crate::types::{NamespaceId, NamespaceKind, ProcessId};

/// nsview error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required input was absent or uninitialized
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Allocation failed while growing a registry or forest
    #[error("Resource exhausted: {message}")]
    ResourceExhausted {
        /// Error message
        message: String,
    },

    /// No namespace carries the requested id
    #[error("No such namespace: {nid}")]
    NamespaceNotFound {
        /// Requested namespace id
        nid: NamespaceId,
    },

    /// No process carries the requested pid
    #[error("No such process: {pid}")]
    ProcessNotFound {
        /// Requested process id
        pid: ProcessId,
    },

    /// An external source could not supply a fact about a process
    #[error("Cannot read {what} of process {pid}: {message}")]
    SourceUnavailable {
        /// Process the fact belongs to
        pid: ProcessId,
        /// Which fact was requested
        what: String,
        /// Error message
        message: String,
    },

    /// A process with the same pid is already registered
    #[error("Process {pid} is already registered")]
    DuplicateProcess {
        /// Duplicated process id
        pid: ProcessId,
    },

    /// A namespace with the same kind and id is already registered
    #[error("Namespace {kind}:[{nid}] is already registered")]
    DuplicateNamespace {
        /// Namespace kind
        kind: NamespaceKind,
        /// Duplicated namespace id
        nid: NamespaceId,
    },

    /// Permission denied
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Check if this is a lookup miss rather than a failure
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NamespaceNotFound { .. } | Self::ProcessNotFound { .. }
        )
    }

    /// Check if this error must abort a topology build
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::ResourceExhausted { .. }
        )
    }

    /// Wrap an I/O failure of an external source
    pub fn source_unavailable(
        pid: ProcessId,
        what: impl Into<String>,
        err: &std::io::Error,
    ) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied {
                operation: format!("read {} of process {pid}", what.into()),
            };
        }
        Self::SourceUnavailable {
            pid,
            what: what.into(),
            message: err.to_string(),
        }
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::ResourceExhausted {
            message: err.to_string(),
        }
    }
}

/// Result type alias for nsview operations
pub type Result<T> = std::result::Result<T, Error>;
