//! nsview Core - Foundation types and errors
//!
//! This crate provides the identifiers and small value types shared by the
//! namespace topology builder and the command-line front end.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{IdMap, IdMapEntry, KindSet, NamespaceId, NamespaceKind, ProcessId, MAP_LIMIT};
