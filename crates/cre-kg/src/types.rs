//! Schema types for the knowledge graph: `Package`, `Version`, `Module`,
//! `Attribute` nodes and the `HAS_VERSION` / `HAS_MODULE` / `HAS_ATTRIBUTE` /
//! `REQUIRES` edges between them (spec.md §6.2).

use std::fmt;

use cre_version::Version as Pep440Version;
use serde::{Deserialize, Serialize};

/// Opaque id for a `Module` node.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u64);

/// Opaque id for a `Version` node.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct VersionId(pub u64);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A `Package` node is identified directly by its canonicalized name —
/// there's exactly one package per canonical name, so the name doubles as
/// the id (spec.md §3: "Canonicalized name ... plus a set of known
/// versions").
pub type PackageId = String;

/// Per-version install outcome recorded by the (out-of-scope) sandboxed
/// install-and-import probe that populates the graph.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum InstallStatus {
    /// The version installed and imported successfully under the probed dialect.
    Success,
    /// The version failed to install or failed to import.
    Fail,
    /// The version was never probed.
    Unknown,
}

/// A `Module` node.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Dotted module name, e.g. `numpy.core`.
    pub name: String,
    /// Whether this module imported successfully during KG population.
    pub import_status: bool,
}

/// A `Version` node.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// The owning package's canonical name.
    pub package: PackageId,
    /// The parsed version.
    pub version: Pep440Version,
    /// Install outcome for this version.
    pub install_status: InstallStatus,
}

/// The induced subgraph returned by `require_subgraph`: every `Package` and
/// `Version` node reachable from the given packages via `HAS_VERSION` and
/// `REQUIRES` edges, plus those edges themselves.
#[derive(Debug, Clone, Default)]
pub struct RequireSubgraph {
    /// Package nodes in the subgraph.
    pub packages: Vec<PackageId>,
    /// Version nodes in the subgraph, with their info.
    pub versions: Vec<(VersionId, VersionInfo)>,
    /// `Package -[:HAS_VERSION]-> Version` edges.
    pub has_version: Vec<(PackageId, VersionId)>,
    /// `Version -[:REQUIRES {requirement}]-> Package` edges.
    pub requires: Vec<(VersionId, PackageId, String)>,
}
