//! The six read-only KG operations (spec.md §4.B). The backend that answers
//! these — a graph database, a flat-file index, whatever — is out of scope;
//! this crate only fixes the contract and ships an in-memory reference
//! implementation (`cre_kg::memory::MemoryKg`) for tests and offline use.

use rustc_hash::FxHashMap;

use crate::types::{ModuleId, ModuleInfo, PackageId, RequireSubgraph, VersionId, VersionInfo};

/// Error surfaced by a KG backend. Per spec.md §7, any `KGQueryError`
/// propagates all the way up and fails the whole inference — there is no
/// degraded path for a broken backend, only for an exhausted search.
#[derive(Debug, thiserror::Error)]
pub enum KgError {
    /// The backend's transport or storage failed.
    #[error("knowledge graph query failed: {0}")]
    Backend(String),

    /// A query referenced a node id the backend doesn't know about.
    #[error("unknown node id: {0}")]
    UnknownId(String),
}

/// The read-only contract a knowledge-graph backend must satisfy.
pub trait KnowledgeGraph {
    /// Exact-name lookup of `Module` nodes.
    fn module_by_name(&self, name: &str) -> Result<Vec<(ModuleId, bool)>, KgError>;

    /// Appends to `acc[top_id]` every submodule name reachable from `top_id`
    /// via at most `max_hop` `HAS_MODULE` edges whose own `import_status` is
    /// `true`.
    fn submodules_within(
        &self,
        top_id: ModuleId,
        max_hop: u32,
        acc: &mut FxHashMap<ModuleId, Vec<String>>,
    ) -> Result<(), KgError>;

    /// Appends `submodule.attr` strings for every `HAS_ATTRIBUTE` edge from
    /// any descendant of `module_ids` whose name is in `submodule_names`.
    fn attributes_of(
        &self,
        module_ids: &[ModuleId],
        submodule_names: &[String],
        acc: &mut FxHashMap<ModuleId, Vec<String>>,
    ) -> Result<(), KgError>;

    /// All packages whose versions expose any of the given modules, mapped
    /// to the set of version ids that do.
    fn packages_versions_of(
        &self,
        module_ids: &[ModuleId],
    ) -> Result<FxHashMap<PackageId, Vec<VersionId>>, KgError>;

    /// The induced subgraph over `HAS_VERSION` and `REQUIRES` edges rooted
    /// at the given packages.
    fn require_subgraph(&self, package_names: &[PackageId]) -> Result<RequireSubgraph, KgError>;

    /// Node-attribute accessor for a `Module` node.
    fn module_info(&self, id: ModuleId) -> Result<ModuleInfo, KgError>;

    /// Node-attribute accessor for a `Version` node.
    fn version_info(&self, id: VersionId) -> Result<VersionInfo, KgError>;
}
