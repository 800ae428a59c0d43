//! The knowledge-graph query contract — component B of the dependency
//! inference engine (spec.md §4.B, §6.2).
//!
//! The backend that actually answers these queries (a graph database
//! populated by sandboxed install-and-import probing) is out of scope; this
//! crate fixes the six read-only operations as a trait and ships
//! [`memory::MemoryKg`], an in-memory implementation used by tests and by
//! `cre-cli`'s offline mode.

#![deny(missing_docs)]

pub mod fixture;
pub mod memory;
mod trait_def;
mod types;

pub use fixture::KgFixture;
pub use trait_def::{KgError, KnowledgeGraph};
pub use types::{
    InstallStatus, ModuleId, ModuleInfo, PackageId, RequireSubgraph, VersionId, VersionInfo,
};
