//! Node identity and the four node variants (spec.md §3 "RequireGraph").

use cre_kg::{PackageId, VersionId};

/// Identifies any node in a [`crate::RequireGraph`]. `Package` and `Version`
/// double as their own id (a package's canonical name, a version's KG id)
/// rather than the synthetic integer ids the original system used for every
/// node — there's no reason to invent an id for something that already has
/// a stable one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    /// The single sentinel root.
    Root,
    /// One of the snippet's top-level imported identifiers, by index into
    /// [`crate::RequireGraph::slots`].
    Slot(u32),
    /// A library, named by its canonicalized package name.
    Package(PackageId),
    /// A concrete release.
    Version(VersionId),
}

impl NodeId {
    /// Whether every out-neighbor of this node must hold simultaneously
    /// (`AND`, i.e. Root/Version) or exactly one must be chosen (`OR`, i.e.
    /// ModuleSlot/Package). Derived from the variant alone — spec.md §9
    /// notes this never needs its own table.
    pub fn is_conjunction(&self) -> bool {
        matches!(self, NodeId::Root | NodeId::Version(_))
    }
}
