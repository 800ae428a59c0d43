//! The four-layer requirement graph builder (spec.md §3, §4.E) — component
//! D. Builds a static graph from one dialect's candidate libraries plus the
//! knowledge graph's requirement edges; the resolver and SAT crates
//! traverse it read-only and track their own selection state alongside it.

#![deny(missing_docs)]

mod node;
mod subgraph;

use std::collections::BTreeSet;

use cre_kg::{InstallStatus, KgError, KnowledgeGraph, PackageId, VersionId};
use cre_ranker::CandidateLibraries;
use cre_version::{SpecifierSet, Version, VersionSpecifierParseError};
use rustc_hash::FxHashMap;

pub use node::NodeId;
pub use subgraph::Subgraph;

/// Failure building a [`RequireGraph`].
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The knowledge graph backend failed.
    #[error(transparent)]
    Kg(#[from] KgError),
    /// A `REQUIRES` edge carried a requirement string that doesn't parse.
    #[error("invalid requirement string: {0}")]
    Specifier(#[from] VersionSpecifierParseError),
}

/// The label on a `ModuleSlot → Package` edge (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEdge {
    /// Unconstrained — any version of the package is acceptable.
    Any,
    /// Restrict to this set of candidate version ids.
    Versions(BTreeSet<VersionId>),
}

impl SlotEdge {
    fn restriction_size(&self) -> usize {
        match self {
            SlotEdge::Any => 0,
            SlotEdge::Versions(ids) => ids.len(),
        }
    }
}

/// One top-level imported identifier (spec.md §3 "ModuleSlot").
#[derive(Debug, Clone)]
pub struct SlotNode {
    /// The imported identifier this slot represents.
    pub top_module: String,
    /// Candidate packages, sorted descending by restriction-set size (the
    /// packages the ranker most specifically pinned down come first; wholly
    /// unconstrained packages are tried last).
    pub children: Vec<(PackageId, SlotEdge)>,
}

/// A library (spec.md §3 "Package").
#[derive(Debug, Clone)]
pub struct PackageNode {
    /// Canonicalized package name, doubling as this node's id.
    pub name: PackageId,
    /// Whether the knowledge graph has an entry for this package at all.
    pub known: bool,
    /// Candidate versions, sorted newest-first then banded by install
    /// status (spec.md §4.E.1).
    pub versions: Vec<VersionId>,
}

/// A concrete release (spec.md §3 "Version").
#[derive(Debug, Clone)]
pub struct VersionNode {
    /// This version's id.
    pub id: VersionId,
    /// The owning package's canonical name.
    pub package: PackageId,
    /// The parsed version.
    pub version: Version,
    /// Install outcome.
    pub install_status: InstallStatus,
    /// Required packages and the specifier each requirement constrains the
    /// chosen version to, sorted ascending by the required package's total
    /// version count (fail fast on the most constrained requirement).
    pub requires: Vec<(PackageId, SpecifierSet)>,
}

/// The static requirement graph for one dialect attempt. Root → ModuleSlot
/// (AND → OR), ModuleSlot → Package (OR → OR), Package → Version (OR →
/// AND), Version → Package (AND → OR), closing the cycle — requirement
/// cycles between versions are possible and are handled by whoever
/// traverses this graph, not by the graph itself.
#[derive(Debug, Clone, Default)]
pub struct RequireGraph {
    /// Slot indices in root-traversal order: ascending by candidate-package
    /// count, so slots most likely to fail fast are tried first.
    pub root_order: Vec<u32>,
    /// All module slots, indexed by [`NodeId::Slot`].
    pub slots: Vec<SlotNode>,
    /// All package nodes (known and synthetic-unknown), by canonical name.
    pub packages: FxHashMap<PackageId, PackageNode>,
    /// All version nodes, by id.
    pub versions: FxHashMap<VersionId, VersionNode>,
}

impl RequireGraph {
    /// Sorted requirement-specifier edges of a Version node's out-neighbor
    /// `pid`, ascending by that package's total version count (spec.md
    /// §4.E "Version: Packages ascending by child count").
    pub fn package_version_count(&self, pid: &str) -> usize {
        self.packages.get(pid).map_or(0, |p| p.versions.len())
    }

    /// The label on the edge from `parent` to the Package node `pkg`, if
    /// `parent` actually has such an edge. `Root` and `Package` parents
    /// never label a Package edge (Root doesn't point at packages directly;
    /// nothing points from one Package to another).
    pub fn package_edge_label(&self, parent: &NodeId, pkg: &str) -> Option<PackageEdgeLabel<'_>> {
        match parent {
            NodeId::Slot(idx) => self.slots[*idx as usize]
                .children
                .iter()
                .find(|(name, _)| name == pkg)
                .map(|(_, edge)| PackageEdgeLabel::FromSlot(edge)),
            NodeId::Version(vid) => self.versions[vid]
                .requires
                .iter()
                .find(|(name, _)| name == pkg)
                .map(|(_, spec)| PackageEdgeLabel::FromVersion(spec)),
            NodeId::Root | NodeId::Package(_) => None,
        }
    }
}

/// The label on an edge pointing at a Package node — either a ModuleSlot's
/// version-id restriction or a Version's requirement specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageEdgeLabel<'a> {
    /// `ModuleSlot → Package`.
    FromSlot(&'a SlotEdge),
    /// `Version → Package`.
    FromVersion(&'a SpecifierSet),
}

fn sort_versions(ids: &[VersionId], versions: &FxHashMap<VersionId, VersionNode>) -> Vec<VersionId> {
    let mut by_semver = ids.to_vec();
    by_semver.sort_by(|a, b| versions[b].version.cmp(&versions[a].version));

    let band = |id: &VersionId| match versions[id].install_status {
        InstallStatus::Success => 0,
        InstallStatus::Unknown => 1,
        InstallStatus::Fail => 2,
    };
    by_semver.sort_by_key(band);
    by_semver
}

/// Build the requirement graph for one dialect's ranked candidates
/// (spec.md §4.E steps 1–5).
pub fn build(kg: &dyn KnowledgeGraph, candidates: &CandidateLibraries) -> Result<RequireGraph, GraphError> {
    let mut all_package_names: BTreeSet<PackageId> = BTreeSet::new();
    for packages in candidates.values() {
        all_package_names.extend(packages.keys().cloned());
    }
    let sub = kg.require_subgraph(&all_package_names.into_iter().collect::<Vec<_>>())?;

    let mut packages: FxHashMap<PackageId, PackageNode> = FxHashMap::default();
    for name in &sub.packages {
        packages.insert(
            name.clone(),
            PackageNode {
                name: name.clone(),
                known: true,
                versions: Vec::new(),
            },
        );
    }
    for (pkg, vid) in &sub.has_version {
        if let Some(node) = packages.get_mut(pkg) {
            node.versions.push(*vid);
        }
    }

    let mut versions: FxHashMap<VersionId, VersionNode> = FxHashMap::default();
    for (vid, info) in &sub.versions {
        versions.insert(
            *vid,
            VersionNode {
                id: *vid,
                package: info.package.clone(),
                version: info.version.clone(),
                install_status: info.install_status,
                requires: Vec::new(),
            },
        );
    }
    for (vid, req_pkg, requirement) in &sub.requires {
        let specifier: SpecifierSet = requirement.parse()?;
        if let Some(node) = versions.get_mut(vid) {
            node.requires.push((req_pkg.clone(), specifier));
        }
    }

    for node in packages.values_mut() {
        node.versions = sort_versions(&node.versions, &versions);
    }
    for node in versions.values_mut() {
        let counts: FxHashMap<PackageId, usize> = node
            .requires
            .iter()
            .map(|(pkg, _)| (pkg.clone(), packages.get(pkg).map_or(0, |p| p.versions.len())))
            .collect();
        node.requires.sort_by_key(|(pkg, _)| counts[pkg]);
    }

    let mut slots = Vec::with_capacity(candidates.len());
    for (top_module, candidate_packages) in candidates {
        let mut children = Vec::with_capacity(candidate_packages.len());
        for (pkg_name, vid_set) in candidate_packages {
            if !packages.contains_key(pkg_name) {
                packages.insert(
                    pkg_name.clone(),
                    PackageNode {
                        name: pkg_name.clone(),
                        known: false,
                        versions: Vec::new(),
                    },
                );
            }
            let edge = if vid_set.is_empty() {
                SlotEdge::Any
            } else {
                SlotEdge::Versions(vid_set.clone())
            };
            children.push((pkg_name.clone(), edge));
        }
        children.sort_by_key(|(_, edge)| std::cmp::Reverse(edge.restriction_size()));
        slots.push(SlotNode {
            top_module: top_module.clone(),
            children,
        });
    }

    let mut root_order: Vec<u32> = (0..slots.len() as u32).collect();
    root_order.sort_by_key(|&i| slots[i as usize].children.len());

    Ok(RequireGraph {
        root_order,
        slots,
        packages,
        versions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cre_kg::memory::MemoryKgBuilder;
    use std::collections::BTreeMap;

    #[test]
    fn unknown_package_becomes_synthetic_node() {
        let kg = MemoryKgBuilder::new().build();
        let mut candidates: CandidateLibraries = BTreeMap::new();
        let mut inner = BTreeMap::new();
        inner.insert("mycorp-widget".to_string(), BTreeSet::new());
        candidates.insert("mycorp_widget".to_string(), inner);

        let graph = build(&kg, &candidates).unwrap();
        let pkg = &graph.packages["mycorp-widget"];
        assert!(!pkg.known);
        assert!(pkg.versions.is_empty());
    }

    #[test]
    fn root_order_prefers_fewer_candidates_first() {
        let kg = MemoryKgBuilder::new().build();
        let mut candidates: CandidateLibraries = BTreeMap::new();
        let mut many = BTreeMap::new();
        many.insert("a".to_string(), BTreeSet::new());
        many.insert("b".to_string(), BTreeSet::new());
        let mut few = BTreeMap::new();
        few.insert("c".to_string(), BTreeSet::new());
        candidates.insert("wide".to_string(), many);
        candidates.insert("narrow".to_string(), few);

        let graph = build(&kg, &candidates).unwrap();
        let first = &graph.slots[graph.root_order[0] as usize];
        assert_eq!(first.top_module, "narrow");
    }

    #[test]
    fn versions_sorted_newest_first_then_by_install_band() {
        let mut b = MemoryKgBuilder::new();
        let top = b.add_module("numpy", true);
        let old_ok = b.add_version("numpy", "1.20.0", InstallStatus::Success, top);
        let new_fail = b.add_version("numpy", "1.22.0", InstallStatus::Fail, top);
        let new_ok = b.add_version("numpy", "1.21.0", InstallStatus::Success, top);
        let kg = b.build();

        let mut candidates: CandidateLibraries = BTreeMap::new();
        let mut inner = BTreeMap::new();
        inner.insert(
            "numpy".to_string(),
            BTreeSet::from([old_ok, new_fail, new_ok]),
        );
        candidates.insert("numpy".to_string(), inner);

        let graph = build(&kg, &candidates).unwrap();
        assert_eq!(graph.packages["numpy"].versions, vec![new_ok, old_ok, new_fail]);
    }
}
