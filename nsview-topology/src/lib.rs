//! Namespace topology of a running Linux system
//!
//! This crate links every process to the namespace it belongs to for each
//! of the seven namespace kinds and rebuilds the per-kind namespace forests:
//! - [`ProcessRegistry`] - discovered processes, ordered by pid
//! - [`NamespaceDirectory`] - namespace records, one per `(kind, id)`
//! - [`NamespaceForest`] - per-kind parent/child structure
//! - [`Topology`] - the assembled snapshot and its queries
//!
//! Facts about processes come from a [`NamespaceSource`]; [`ProcFs`] reads
//! them from procfs and [`MockSource`] serves them from memory.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod assembler;
pub mod config;
pub mod forest;
pub mod namespace;
pub mod process;
pub mod procfs;
pub mod query;
pub mod source;

pub use assembler::Topology;
pub use config::ReportConfig;
pub use forest::{ForestReport, NamespaceForest, NodeId, Preorder, ReportEntry};
pub use namespace::{Namespace, NamespaceDirectory};
pub use process::{Process, ProcessRegistry};
pub use procfs::ProcFs;
pub use query::ProcessScope;
pub use source::{MockSource, NamespaceSource, ProcessInfo};

// Re-export commonly used types
pub use nsview_core::{Error, IdMap, IdMapEntry, KindSet, NamespaceId, NamespaceKind, ProcessId, Result};
