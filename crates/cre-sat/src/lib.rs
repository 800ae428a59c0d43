//! CNF encoding and CDCL fallback (spec.md §4.G) — component F. Runs only
//! when the heuristic resolver fails outright: every node becomes a boolean
//! variable, Root is asserted true, and the graph's AND/OR shape becomes a
//! set of clauses that [`varisat`] either satisfies or proves unsatisfiable.

#![deny(missing_docs)]

use std::collections::BTreeSet;

use cre_graph::{NodeId, RequireGraph, SlotEdge, Subgraph};
use cre_kg::InstallStatus;
use rustc_hash::FxHashMap;
use varisat::{ExtendFormula, Lit, Solver};

/// Failure running the SAT fallback.
#[derive(Debug, thiserror::Error)]
pub enum SatError {
    /// The underlying solver reported an internal error.
    #[error("sat solver failure: {0}")]
    Solver(String),
}

/// Attempt to satisfy the whole graph at once via CDCL. Returns `None` if
/// the CNF encoding is unsatisfiable — the caller falls back further to a
/// degraded best-effort plan (spec.md §4.H).
pub fn solve(graph: &RequireGraph) -> Result<Option<Subgraph>, SatError> {
    let var_map = assign_vars(graph);
    let clauses = encode(graph, &var_map);

    let mut solver = Solver::new();
    for clause in &clauses {
        let lits: Vec<Lit> = clause.iter().map(|&n| Lit::from_dimacs(n as isize)).collect();
        solver.add_clause(&lits);
    }

    let sat = solver.solve().map_err(|e| SatError::Solver(e.to_string()))?;
    if !sat {
        return Ok(None);
    }

    let model = solver.model().expect("solver reported SAT without a model");
    let true_vars: BTreeSet<i32> = model
        .iter()
        .filter(|lit| lit.is_positive())
        .map(|lit| lit.var().to_dimacs() as i32)
        .collect();

    Ok(Some(reconstruct(graph, &var_map, &true_vars)))
}

/// Every node in the static graph gets a variable, reachable or not — the
/// original system's `var_list` is every key of its node table, not a
/// traversal order.
fn assign_vars(graph: &RequireGraph) -> FxHashMap<NodeId, i32> {
    let mut nodes = vec![NodeId::Root];
    nodes.extend((0..graph.slots.len() as u32).map(NodeId::Slot));
    nodes.extend(graph.packages.keys().cloned().map(NodeId::Package));
    nodes.extend(graph.versions.keys().copied().map(NodeId::Version));

    nodes
        .into_iter()
        .enumerate()
        .map(|(i, node)| (node, (i + 1) as i32))
        .collect()
}

fn encode(graph: &RequireGraph, var_map: &FxHashMap<NodeId, i32>) -> Vec<Vec<i32>> {
    let v = |id: &NodeId| var_map[id];
    let mut clauses: Vec<Vec<i32>> = vec![vec![v(&NodeId::Root)]];

    for &idx in &graph.root_order {
        clauses.push(vec![-v(&NodeId::Root), v(&NodeId::Slot(idx))]);
    }

    for (vid, node) in &graph.versions {
        let x = NodeId::Version(*vid);
        for (pkg, spec) in &node.requires {
            let c = NodeId::Package(pkg.clone());
            clauses.push(vec![-v(&x), v(&c)]);
            if let Some(pkg_node) = graph.packages.get(pkg) {
                for &pv in &pkg_node.versions {
                    if !spec.contains(&graph.versions[&pv].version) {
                        clauses.push(vec![-v(&x), -v(&NodeId::Version(pv))]);
                    }
                }
            }
        }
    }

    for (name, node) in &graph.packages {
        if node.versions.is_empty() {
            continue;
        }
        let x = NodeId::Package(name.clone());
        let mut disjunction = vec![-v(&x)];
        disjunction.extend(node.versions.iter().map(|vid| v(&NodeId::Version(*vid))));
        clauses.push(disjunction);

        for &vid in &node.versions {
            if graph.versions[&vid].install_status == InstallStatus::Fail {
                clauses.push(vec![-v(&NodeId::Version(vid))]);
            }
        }
        for (i, &a) in node.versions.iter().enumerate() {
            for &b in &node.versions[i + 1..] {
                clauses.push(vec![-v(&NodeId::Version(a)), -v(&NodeId::Version(b))]);
            }
        }
    }

    for (idx, slot) in graph.slots.iter().enumerate() {
        let x = NodeId::Slot(idx as u32);
        let mut optional_child = Vec::new();
        for (pkg, edge) in &slot.children {
            if let SlotEdge::Versions(ids) = edge {
                let p = v(&NodeId::Package(pkg.clone()));
                for &vid in ids {
                    clauses.push(vec![-v(&NodeId::Version(vid)), p]);
                    optional_child.push(v(&NodeId::Version(vid)));
                }
            }
        }
        if !optional_child.is_empty() {
            optional_child.push(-v(&x));
            clauses.push(optional_child);
        }
    }

    clauses
}

/// Build a subgraph from a satisfying assignment: keep every true node and
/// every static edge whose endpoints are both kept, then iteratively drop
/// kept non-Root nodes with no surviving incoming edge until a fixpoint —
/// witnesses the encoding left free (e.g. an unconstrained ModuleSlot
/// candidate) don't leak into the plan unless something actually selects
/// them.
fn reconstruct(graph: &RequireGraph, var_map: &FxHashMap<NodeId, i32>, true_vars: &BTreeSet<i32>) -> Subgraph {
    let reverse: FxHashMap<i32, NodeId> = var_map.iter().map(|(k, v)| (*v, k.clone())).collect();
    let keep: BTreeSet<NodeId> = true_vars.iter().filter_map(|v| reverse.get(v).cloned()).collect();

    let mut sub = Subgraph::default();
    for node in &keep {
        sub.ensure(node);
    }

    let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
    for &idx in &graph.root_order {
        edges.push((NodeId::Root, NodeId::Slot(idx)));
    }
    for (idx, slot) in graph.slots.iter().enumerate() {
        for (pkg, _) in &slot.children {
            edges.push((NodeId::Slot(idx as u32), NodeId::Package(pkg.clone())));
        }
    }
    for (name, pkg) in &graph.packages {
        for &vid in &pkg.versions {
            edges.push((NodeId::Package(name.clone()), NodeId::Version(vid)));
        }
    }
    for (vid, node) in &graph.versions {
        for (pkg, _) in &node.requires {
            edges.push((NodeId::Version(*vid), NodeId::Package(pkg.clone())));
        }
    }

    for (a, b) in edges {
        if keep.contains(&a) && keep.contains(&b) {
            sub.add_edge(a, b);
        }
    }

    loop {
        let drop: Vec<NodeId> = sub
            .nodes()
            .filter(|n| **n != NodeId::Root && sub.incoming(n).is_empty())
            .cloned()
            .collect();
        if drop.is_empty() {
            break;
        }
        for n in drop {
            for child in sub.outgoing(&n) {
                sub.remove_edge(&n, &child);
            }
        }
    }

    sub.prune_isolated();
    sub
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
    fn satisfiable_graph_picks_a_version() {
        let mut b = MemoryKgBuilder::new();
        let top = b.add_module("numpy", true);
        let v1 = b.add_version("numpy", "1.20.0", InstallStatus::Success, top);
        let kg = b.build();

        let candidate_libraries = candidates("numpy", "numpy", BTreeSet::from([v1]));
        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();
        let solution = solve(&graph).unwrap().unwrap();

        let pkg_node = NodeId::Package("numpy".to_string());
        assert_eq!(solution.outgoing(&pkg_node), BTreeSet::from([NodeId::Version(v1)]));
    }

    #[test]
    fn unsatisfiable_conflict_returns_none() {
        let mut b = MemoryKgBuilder::new();
        let top_a = b.add_module("a", true);
        let top_c = b.add_module("c", true);
        let a1 = b.add_version("a", "2.0.0", InstallStatus::Success, top_a);
        let c1 = b.add_version("c", "2.5.0", InstallStatus::Success, top_c);
        b.add_requirement(a1, "c", ">=3");
        let kg = b.build();

        let candidate_libraries = candidates("a", "a", BTreeSet::from([a1]));
        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();
        assert!(solve(&graph).unwrap().is_none());
        let _ = c1;
    }

    #[test]
    fn fail_status_version_is_excluded() {
        let mut b = MemoryKgBuilder::new();
        let top = b.add_module("numpy", true);
        let v1 = b.add_version("numpy", "1.20.0", InstallStatus::Fail, top);
        let v2 = b.add_version("numpy", "1.19.0", InstallStatus::Success, top);
        let kg = b.build();

        let candidate_libraries = candidates("numpy", "numpy", BTreeSet::from([v1, v2]));
        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();
        let solution = solve(&graph).unwrap().unwrap();

        let pkg_node = NodeId::Package("numpy".to_string());
        assert_eq!(solution.outgoing(&pkg_node), BTreeSet::from([NodeId::Version(v2)]));
    }
}
