//! The heuristic backtracking resolver (spec.md §4.F) — component E. A
//! depth-first search over a [`RequireGraph`] that picks one Version per
//! Package, preferring installable, newer releases, and backtracks via
//! copy-on-write [`Subgraph`] snapshots rather than mutating in place.

#![deny(missing_docs)]

use std::collections::BTreeSet;

use cre_graph::{NodeId, PackageEdgeLabel, RequireGraph, SlotEdge, Subgraph};
use cre_kg::InstallStatus;
use cre_version::SpecifierSet;

/// Run the resolver from Root. Returns `None` if no assignment satisfies
/// every constraint — the caller falls back to the SAT encoder (spec.md
/// §4.G).
pub fn resolve(graph: &RequireGraph) -> Option<Subgraph> {
    let empty = Subgraph::default();
    let mut solved = solve(graph, &empty, NodeId::Root, None)?;
    solved.prune_isolated();
    Some(solved)
}

fn solve(graph: &RequireGraph, state: &Subgraph, node: NodeId, parent: Option<NodeId>) -> Option<Subgraph> {
    let mut temp = state.clone();
    temp.ensure(&node);
    if let Some(p) = parent {
        temp.add_edge(p, node.clone());
    }

    if node.is_conjunction() {
        for child in and_children(graph, &node) {
            temp = solve(graph, &temp, child, Some(node.clone()))?;
        }
        Some(temp)
    } else {
        solve_or(graph, temp, node)
    }
}

fn and_children(graph: &RequireGraph, node: &NodeId) -> Vec<NodeId> {
    match node {
        NodeId::Root => graph.root_order.iter().map(|&i| NodeId::Slot(i)).collect(),
        NodeId::Version(vid) => graph.versions[vid]
            .requires
            .iter()
            .map(|(pkg, _)| NodeId::Package(pkg.clone()))
            .collect(),
        NodeId::Slot(_) | NodeId::Package(_) => unreachable!("AND nodes are Root or Version"),
    }
}

fn solve_or(graph: &RequireGraph, mut temp: Subgraph, node: NodeId) -> Option<Subgraph> {
    if let NodeId::Package(name) = &node {
        if graph.packages[name].versions.is_empty() {
            // Unknown package (or a known one with no versions in the KG):
            // nothing further to satisfy.
            return Some(temp);
        }
    }

    let all_children = static_children(graph, &node);
    let optional = prune(graph, &temp, &node, &all_children);

    if let Some(existing) = temp.outgoing(&node).iter().next().cloned() {
        match &node {
            NodeId::Slot(_) => {
                let mut reordered = optional.clone();
                if let Some(pos) = reordered.iter().position(|c| c == &existing) {
                    reordered.remove(pos);
                    reordered.insert(0, existing);
                }
                return try_children(graph, temp, &node, &reordered);
            }
            NodeId::Package(_) => {
                if optional.contains(&existing) {
                    temp.add_edge(node.clone(), existing);
                    return Some(temp);
                }
                temp.remove_edge(&node, &existing);
                if !propagate_delete(graph, &mut temp, &existing) {
                    return None;
                }
            }
            NodeId::Root | NodeId::Version(_) => unreachable!("OR nodes are Slot or Package"),
        }
    }

    try_children(graph, temp, &node, &optional)
}

fn static_children(graph: &RequireGraph, node: &NodeId) -> Vec<NodeId> {
    match node {
        NodeId::Slot(idx) => graph.slots[*idx as usize]
            .children
            .iter()
            .map(|(pkg, _)| NodeId::Package(pkg.clone()))
            .collect(),
        NodeId::Package(name) => graph.packages[name]
            .versions
            .iter()
            .filter(|vid| graph.versions[vid].install_status != InstallStatus::Fail)
            .map(|vid| NodeId::Version(*vid))
            .collect(),
        NodeId::Root | NodeId::Version(_) => unreachable!("OR nodes are Slot or Package"),
    }
}

/// §4.F.1: restrict a Package's candidate versions to the intersection of
/// every incoming edge's constraint, re-applying `_sort_versions`. A no-op
/// for ModuleSlots — their only parent is Root, which never constrains.
fn prune(graph: &RequireGraph, state: &Subgraph, node: &NodeId, children: &[NodeId]) -> Vec<NodeId> {
    let NodeId::Package(name) = node else {
        return children.to_vec();
    };

    let mut all_req = SpecifierSet::empty();
    let mut set_req: Option<BTreeSet<u64>> = None;
    for parent in state.incoming(node) {
        match graph.package_edge_label(&parent, name) {
            Some(PackageEdgeLabel::FromVersion(spec)) => all_req = &all_req & spec,
            Some(PackageEdgeLabel::FromSlot(SlotEdge::Versions(ids))) => {
                let as_u64: BTreeSet<u64> = ids.iter().map(|v| v.0).collect();
                set_req = Some(match set_req {
                    Some(existing) => existing.intersection(&as_u64).copied().collect(),
                    None => as_u64,
                });
            }
            Some(PackageEdgeLabel::FromSlot(SlotEdge::Any)) | None => {}
        }
    }

    let retained: Vec<NodeId> = children
        .iter()
        .filter(|child| {
            let NodeId::Version(vid) = child else {
                return false;
            };
            let in_set = set_req.as_ref().map_or(true, |s| s.contains(&vid.0));
            in_set && all_req.contains(&graph.versions[vid].version)
        })
        .cloned()
        .collect();

    // Re-sort by the package's own precomputed order so banding/newest-first
    // survives the filter.
    let order = &graph.packages[name].versions;
    let mut sorted = retained;
    sorted.sort_by_key(|id| {
        let NodeId::Version(vid) = id else { unreachable!() };
        order.iter().position(|v| v == vid).unwrap_or(usize::MAX)
    });
    sorted
}

fn try_children(graph: &RequireGraph, temp: Subgraph, node: &NodeId, optional: &[NodeId]) -> Option<Subgraph> {
    let mut i = 0;
    while i < optional.len() {
        let child = optional[i].clone();
        match solve(graph, &temp, child.clone(), Some(node.clone())) {
            Some(next) => return Some(next),
            None => {
                let label = skip_label(graph, node, &child);
                i += 1;
                while i < optional.len() {
                    if skip_label(graph, node, &optional[i]) == label && label.is_some() {
                        i += 1;
                    } else {
                        break;
                    }
                }
            }
        }
    }
    None
}

fn skip_label<'a>(graph: &'a RequireGraph, node: &NodeId, child: &NodeId) -> Option<&'a SlotEdge> {
    if let (NodeId::Slot(idx), NodeId::Package(pkg)) = (node, child) {
        graph.slots[*idx as usize]
            .children
            .iter()
            .find(|(name, _)| name == pkg)
            .map(|(_, edge)| edge)
    } else {
        None
    }
}

/// §4.F.2: cascade-deselect everything that was only reachable through
/// `start`, re-solving any node that still has surviving consumers.
fn propagate_delete(graph: &RequireGraph, state: &mut Subgraph, start: &NodeId) -> bool {
    let mut check_list = vec![start.clone()];
    while !check_list.is_empty() {
        let mut next = Vec::new();
        for item in &check_list {
            if state.incoming(item).is_empty() {
                for child in state.outgoing(item) {
                    state.remove_edge(item, &child);
                    next.push(child);
                }
            } else if let Some(updated) = solve(graph, state, item.clone(), None) {
                *state = updated;
            } else {
                return false;
            }
        }
        check_list = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use cre_kg::memory::MemoryKgBuilder;
    use cre_ranker::CandidateLibraries;
    use std::collections::BTreeMap;

    fn candidates(top: &str, pkg: &str, versions: BTreeSet<cre_kg::VersionId>) -> CandidateLibraries {
        let mut inner = BTreeMap::new();
        inner.insert(pkg.to_string(), versions);
        let mut outer = BTreeMap::new();
        outer.insert(top.to_string(), inner);
        outer
    }

    #[test]
    fn resolves_single_package_picking_newest_success() {
        let mut b = MemoryKgBuilder::new();
        let top = b.add_module("numpy", true);
        let v1 = b.add_version("numpy", "1.20.0", InstallStatus::Success, top);
        let v2 = b.add_version("numpy", "1.21.0", InstallStatus::Success, top);
        let v3 = b.add_version("numpy", "1.22.0", InstallStatus::Fail, top);
        let kg = b.build();

        let candidate_libraries = candidates("numpy", "numpy", BTreeSet::from([v1, v2, v3]));
        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();
        let solution = resolve(&graph).unwrap();

        let pkg_node = NodeId::Package("numpy".to_string());
        let chosen = solution.outgoing(&pkg_node);
        assert_eq!(chosen, BTreeSet::from([NodeId::Version(v2)]));
    }

    #[test]
    fn backtracks_across_conflicting_requirements() {
        // A@2.0 requires C>=3 (unsatisfiable, no C>=3 exists); A@1.0 requires C>=1, which is fine.
        let mut b = MemoryKgBuilder::new();
        let top_a = b.add_module("a", true);
        let top_c = b.add_module("c", true);
        let a1 = b.add_version("a", "1.0.0", InstallStatus::Success, top_a);
        let a2 = b.add_version("a", "2.0.0", InstallStatus::Success, top_a);
        let c1 = b.add_version("c", "2.5.0", InstallStatus::Success, top_c);
        b.add_requirement(a1, "c", ">=1");
        b.add_requirement(a2, "c", ">=3");
        let kg = b.build();

        let candidate_libraries = candidates("a", "a", BTreeSet::from([a1, a2]));
        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();
        let solution = resolve(&graph).unwrap();

        let pkg_a = NodeId::Package("a".to_string());
        assert_eq!(solution.outgoing(&pkg_a), BTreeSet::from([NodeId::Version(a1)]));
        let pkg_c = NodeId::Package("c".to_string());
        assert_eq!(solution.outgoing(&pkg_c), BTreeSet::from([NodeId::Version(c1)]));
    }

    #[test]
    fn infeasible_constraints_return_none() {
        // A slot whose version-id restriction matches none of the package's
        // real versions can never be satisfied.
        let mut b = MemoryKgBuilder::new();
        let top_d = b.add_module("d", true);
        b.add_version("d", "4.0.0", InstallStatus::Success, top_d);
        let kg = b.build();

        let candidate_libraries = candidates("d", "d", BTreeSet::from([cre_kg::VersionId(9999)]));
        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();
        assert!(resolve(&graph).is_none());
    }
}
