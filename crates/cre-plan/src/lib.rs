//! The install-plan extractor (spec.md §4.H) — component G. Projects a
//! solved [`Subgraph`] onto a package-version DAG, decides which packages
//! the caller must request explicitly versus which arrive transitively, and
//! orders the result by Kahn's algorithm.

#![deny(missing_docs)]

use std::collections::BTreeSet;

use cre_graph::{NodeId, PackageEdgeLabel, RequireGraph, SlotEdge, Subgraph};
use cre_kg::{PackageId, VersionId};
use cre_version::{SpecifierSet, Version};
use rustc_hash::FxHashMap;

/// One line of the resulting plan: a package name and, unless it's unknown
/// to the knowledge graph, the version pinned for it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InstallPair {
    /// Canonical package name.
    pub package: PackageId,
    /// `None` for a package the knowledge graph has no entry for.
    pub version: Option<Version>,
}

/// The projected, ordered plan.
#[derive(Debug, Clone, Default)]
pub struct InstallPlan {
    /// Explicit packages only, dependencies before dependents.
    pub pairs: Vec<InstallPair>,
    /// Whether a cycle forced an arbitrary-order flush of the remainder.
    pub cyclic: bool,
}

/// Project a solved subgraph into an ordered install plan.
pub fn extract(graph: &RequireGraph, solved: &Subgraph) -> InstallPlan {
    let mut chosen: FxHashMap<PackageId, Option<VersionId>> = FxHashMap::default();
    let mut deps: FxHashMap<PackageId, BTreeSet<PackageId>> = FxHashMap::default();

    for node in solved.nodes() {
        let NodeId::Package(name) = node else {
            continue;
        };

        let version_children: Vec<VersionId> = solved
            .outgoing(node)
            .into_iter()
            .filter_map(|c| match c {
                NodeId::Version(v) => Some(v),
                _ => None,
            })
            .collect();

        // Normally at most one; if the SAT fallback left more than one true,
        // fall back to the package's own newest-first order.
        let vid = graph
            .packages
            .get(name)
            .and_then(|p| p.versions.iter().find(|v| version_children.contains(v)).copied());
        chosen.insert(name.clone(), vid);

        let pkg_deps = vid
            .map(|v| {
                solved
                    .outgoing(&NodeId::Version(v))
                    .into_iter()
                    .filter_map(|c| match c {
                        NodeId::Package(p) => Some(p),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        deps.insert(name.clone(), pkg_deps);
    }

    let explicit = classify_explicit(graph, solved, &chosen);
    let inn = invert(&deps);
    let (pairs, acyclic) = topo_sort(deps, inn, &explicit, &chosen, graph);
    InstallPlan {
        pairs,
        cyclic: !acyclic,
    }
}

/// §4.H's explicit/implicit split: a package with no chosen parent Version
/// is always explicit; otherwise explicit iff its parents disagree on the
/// best version they'd each pick alone, or the version the intersection of
/// their specifiers would naturally produce isn't the one actually chosen.
fn classify_explicit(
    graph: &RequireGraph,
    solved: &Subgraph,
    chosen: &FxHashMap<PackageId, Option<VersionId>>,
) -> BTreeSet<PackageId> {
    let mut explicit = BTreeSet::new();

    for name in chosen.keys() {
        let node = NodeId::Package(name.clone());
        let parent_versions: Vec<VersionId> = solved
            .incoming(&node)
            .into_iter()
            .filter_map(|p| match p {
                NodeId::Version(v) => Some(v),
                _ => None,
            })
            .collect();
        // No Version requires this package — either nothing does (an
        // orphan) or it was pulled in directly by a ModuleSlot. Either way
        // the user has to ask for it explicitly.
        if parent_versions.is_empty() {
            explicit.insert(name.clone());
            continue;
        }

        let specs: Vec<&SpecifierSet> = parent_versions
            .iter()
            .filter_map(|pv| match graph.package_edge_label(&NodeId::Version(*pv), name) {
                Some(PackageEdgeLabel::FromVersion(s)) => Some(s),
                _ => None,
            })
            .collect();
        if specs.is_empty() {
            continue;
        }

        let Some(full_versions) = graph.packages.get(name).map(|p| &p.versions) else {
            continue;
        };
        let satisfies = |spec: &SpecifierSet, vid: &VersionId| spec.contains(&graph.versions[vid].version);

        let mut per_parent_best: Option<VersionId> = None;
        let mut conflict = false;
        for spec in &specs {
            if let Some(&best) = full_versions.iter().find(|v| satisfies(spec, v)) {
                match per_parent_best {
                    None => per_parent_best = Some(best),
                    Some(prev) if prev != best => {
                        conflict = true;
                        break;
                    }
                    _ => {}
                }
            }
        }
        if conflict {
            explicit.insert(name.clone());
            continue;
        }

        let mut all_req = SpecifierSet::empty();
        for spec in &specs {
            all_req = &all_req & *spec;
        }
        let natural = full_versions.iter().find(|v| satisfies(&all_req, v)).copied();

        if natural != chosen[name] {
            explicit.insert(name.clone());
        }
    }

    explicit
}

fn invert(deps: &FxHashMap<PackageId, BTreeSet<PackageId>>) -> FxHashMap<PackageId, BTreeSet<PackageId>> {
    let mut inn: FxHashMap<PackageId, BTreeSet<PackageId>> = FxHashMap::default();
    for key in deps.keys() {
        inn.entry(key.clone()).or_default();
    }
    for (parent, children) in deps {
        for child in children {
            inn.entry(child.clone()).or_default().insert(parent.clone());
        }
    }
    inn
}

/// Kahn's algorithm over the projected DAG: flush packages with no
/// remaining dependencies first (so dependencies precede dependents in the
/// output), emitting only explicit ones. On a cycle, the remaining explicit
/// packages are flushed in name order and `false` is returned.
fn topo_sort(
    mut out: FxHashMap<PackageId, BTreeSet<PackageId>>,
    mut inn: FxHashMap<PackageId, BTreeSet<PackageId>>,
    explicit: &BTreeSet<PackageId>,
    chosen: &FxHashMap<PackageId, Option<VersionId>>,
    graph: &RequireGraph,
) -> (Vec<InstallPair>, bool) {
    let pair_for = |name: &PackageId| InstallPair {
        package: name.clone(),
        version: chosen.get(name).copied().flatten().map(|vid| graph.versions[&vid].version.clone()),
    };

    let mut pairs = Vec::new();
    while !out.is_empty() {
        let ready = out.iter().filter(|(_, deps)| deps.is_empty()).map(|(k, _)| k.clone()).min();
        match ready {
            Some(key) => {
                if explicit.contains(&key) {
                    pairs.push(pair_for(&key));
                }
                for parent in inn.get(&key).cloned().unwrap_or_default() {
                    if let Some(deps) = out.get_mut(&parent) {
                        deps.remove(&key);
                    }
                }
                out.remove(&key);
                inn.remove(&key);
            }
            None => {
                let mut remaining: Vec<&PackageId> = out.keys().filter(|k| explicit.contains(*k)).collect();
                remaining.sort();
                for key in remaining {
                    pairs.push(pair_for(key));
                }
                return (pairs, false);
            }
        }
    }
    (pairs, true)
}

/// The degraded best-effort projection (spec.md §4.H): "one best
/// Package/Version per ModuleSlot with no solvability check", built when
/// both the heuristic resolver and the SAT fallback fail outright.
pub fn best_effort(graph: &RequireGraph) -> Subgraph {
    let mut sub = Subgraph::default();
    for slot in &graph.slots {
        let Some((pkg_name, edge)) = slot.children.first() else {
            continue;
        };
        sub.ensure(&NodeId::Package(pkg_name.clone()));

        let Some(pkg) = graph.packages.get(pkg_name) else {
            continue;
        };
        if pkg.versions.is_empty() {
            continue;
        }

        let vid = match edge {
            SlotEdge::Versions(ids) => pkg.versions.iter().find(|v| ids.contains(v)).copied().unwrap_or(pkg.versions[0]),
            SlotEdge::Any => pkg.versions[0],
        };
        sub.add_edge(NodeId::Package(pkg_name.clone()), NodeId::Version(vid));
    }
    sub
}

#[cfg(test)]
mod tests {
    use super::*;
    use cre_kg::memory::MemoryKgBuilder;
    use cre_kg::InstallStatus;
    use cre_ranker::CandidateLibraries;
    use std::collections::BTreeMap;

    fn candidates(top: &str, pkg: &str, versions: BTreeSet<VersionId>) -> CandidateLibraries {
        let mut inner = BTreeMap::new();
        inner.insert(pkg.to_string(), versions);
        let mut outer = BTreeMap::new();
        outer.insert(top.to_string(), inner);
        outer
    }

    #[test]
    fn directly_selected_package_is_explicit() {
        let mut b = MemoryKgBuilder::new();
        let top = b.add_module("numpy", true);
        let v1 = b.add_version("numpy", "1.20.0", InstallStatus::Success, top);
        let kg = b.build();

        let candidate_libraries = candidates("numpy", "numpy", BTreeSet::from([v1]));
        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();
        let solved = cre_resolver_solve_for_test(&graph);

        let plan = extract(&graph, &solved);
        assert_eq!(plan.pairs.len(), 1);
        assert_eq!(plan.pairs[0].package, "numpy");
        assert!(!plan.cyclic);
    }

    #[test]
    fn naturally_matching_transitive_dependency_is_implicit() {
        let mut b = MemoryKgBuilder::new();
        let top_a = b.add_module("a", true);
        let top_c = b.add_module("c", true);
        let a1 = b.add_version("a", "1.0.0", InstallStatus::Success, top_a);
        let c1 = b.add_version("c", "2.5.0", InstallStatus::Success, top_c);
        b.add_requirement(a1, "c", ">=1");
        let kg = b.build();

        let candidate_libraries = candidates("a", "a", BTreeSet::from([a1]));
        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();
        let solved = cre_resolver_solve_for_test(&graph);

        let plan = extract(&graph, &solved);
        // only "a" is explicit — "c" arrives naturally from the >=1 requirement.
        assert_eq!(plan.pairs.len(), 1);
        assert_eq!(plan.pairs[0].package, "a");
        let _ = c1;
    }

    #[test]
    fn conflicting_parent_requirements_force_explicit() {
        let mut b = MemoryKgBuilder::new();
        let top_a = b.add_module("a", true);
        let top_b = b.add_module("b", true);
        let top_c = b.add_module("c", true);
        let a1 = b.add_version("a", "1.0.0", InstallStatus::Success, top_a);
        let b1 = b.add_version("b", "1.0.0", InstallStatus::Success, top_b);
        let c1 = b.add_version("c", "1.0.0", InstallStatus::Success, top_c);
        let _c2 = b.add_version("c", "2.0.0", InstallStatus::Success, top_c);
        b.add_requirement(a1, "c", "==1.0.0");
        b.add_requirement(b1, "c", "==2.0.0");
        let kg = b.build();

        let mut candidate_libraries: CandidateLibraries = BTreeMap::new();
        let mut a_inner = BTreeMap::new();
        a_inner.insert("a".to_string(), BTreeSet::from([a1]));
        candidate_libraries.insert("a".to_string(), a_inner);
        let mut b_inner = BTreeMap::new();
        b_inner.insert("b".to_string(), BTreeSet::from([b1]));
        candidate_libraries.insert("b".to_string(), b_inner);

        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();

        // Can't both be satisfied by the heuristic resolver (c has one
        // version per requirement); build the solved subgraph by hand to
        // exercise the explicit/implicit split directly.
        let mut solved = Subgraph::default();
        solved.add_edge(NodeId::Package("a".to_string()), NodeId::Version(a1));
        solved.add_edge(NodeId::Package("b".to_string()), NodeId::Version(b1));
        solved.add_edge(NodeId::Version(a1), NodeId::Package("c".to_string()));
        solved.add_edge(NodeId::Version(b1), NodeId::Package("c".to_string()));
        solved.add_edge(NodeId::Package("c".to_string()), NodeId::Version(c1));

        let plan = extract(&graph, &solved);
        let names: BTreeSet<&str> = plan.pairs.iter().map(|p| p.package.as_str()).collect();
        assert!(names.contains("a"));
        assert!(names.contains("c"));
    }

    #[test]
    fn best_effort_picks_first_candidate_without_checking_requirements() {
        let mut b = MemoryKgBuilder::new();
        let top = b.add_module("numpy", true);
        b.add_version("numpy", "1.19.0", InstallStatus::Success, top);
        let newest = b.add_version("numpy", "1.21.0", InstallStatus::Success, top);
        let kg = b.build();

        let candidate_libraries = candidates("numpy", "numpy", BTreeSet::new());
        let graph = cre_graph::build(&kg, &candidate_libraries).unwrap();
        let sub = best_effort(&graph);

        assert_eq!(
            sub.outgoing(&NodeId::Package("numpy".to_string())),
            BTreeSet::from([NodeId::Version(newest)])
        );
    }

    fn cre_resolver_solve_for_test(graph: &RequireGraph) -> Subgraph {
        cre_resolver::resolve(graph).expect("fixture graphs in this test module are always satisfiable")
    }
}
