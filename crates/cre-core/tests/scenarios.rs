//! End-to-end scenarios from spec.md §8, run against an in-memory
//! knowledge-graph fixture.

use std::collections::BTreeSet;

use cre_core::{infer, Status};
use cre_kg::memory::MemoryKgBuilder;
use cre_kg::InstallStatus;
use cre_parser::LexicalParser;

fn parsers() -> (LexicalParser, LexicalParser) {
    (LexicalParser::d2(), LexicalParser::d3())
}

#[test]
fn empty_snippet_yields_empty_plan_and_prefers_d3() {
    let kg = MemoryKgBuilder::new().build();
    let (d2, d3) = parsers();
    let out = infer(&kg, "", &d2, &d3).unwrap();

    assert_eq!(out.install_pairs, Some(Vec::new()));
    assert_eq!(out.status, Status::Heuristic);
    assert_eq!(out.dialect, Some(cre_parser::Dialect::D3));
}

#[test]
fn single_stdlib_import_yields_empty_plan() {
    let kg = MemoryKgBuilder::new().build();
    let (d2, d3) = parsers();
    let out = infer(&kg, "import os\n", &d2, &d3).unwrap();

    assert_eq!(out.install_pairs, Some(Vec::new()));
    assert_eq!(out.status, Status::Heuristic);
}

#[test]
fn unknown_top_module_synthesizes_a_nameless_candidate() {
    let kg = MemoryKgBuilder::new().build();
    let (d2, d3) = parsers();
    let out = infer(&kg, "import mycorp_widget\n", &d2, &d3).unwrap();

    let pairs = out.install_pairs.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].package, "mycorp-widget");
    assert_eq!(pairs[0].version, None);
    assert_eq!(out.status, Status::Heuristic);
}

#[test]
fn exact_match_picks_newest_installable_version() {
    let mut b = MemoryKgBuilder::new();
    let top = b.add_module("numpy", true);
    b.add_attribute(top, "array");
    b.add_version("numpy", "1.20.0", InstallStatus::Success, top);
    b.add_version("numpy", "1.21.0", InstallStatus::Success, top);
    b.add_version("numpy", "1.22.0", InstallStatus::Fail, top);
    let kg = b.build();

    let (d2, d3) = parsers();
    let out = infer(&kg, "import numpy\nnumpy.array([1, 2, 3])\n", &d2, &d3).unwrap();

    let pairs = out.install_pairs.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].package, "numpy");
    assert_eq!(pairs[0].version.as_ref().unwrap().to_string(), "1.21.0");
    assert_eq!(out.status, Status::Heuristic);
}

#[test]
fn conflict_resolvable_backtracks_to_a_compatible_combination() {
    let mut b = MemoryKgBuilder::new();

    // Alphabetically first, so the root visits it (and pins `corelib`
    // provisionally) before the two-version package gets a turn.
    let rigid_top = b.add_module("alpha_rigid", true);
    let rigid_v1 = b.add_version("alpha_rigid", "1.0.0", InstallStatus::Success, rigid_top);

    let flex_top = b.add_module("zulu_flex", true);
    let flex_v2 = b.add_version("zulu_flex", "2.0.0", InstallStatus::Success, flex_top);
    let flex_v1 = b.add_version("zulu_flex", "1.0.0", InstallStatus::Success, flex_top);

    let core_top = b.add_module("corelib_internal", false);
    b.add_version("corelib", "1.0.0", InstallStatus::Success, core_top);
    b.add_version("corelib", "2.0.0", InstallStatus::Success, core_top);
    b.add_version("corelib", "2.9.0", InstallStatus::Success, core_top);
    b.add_version("corelib", "3.0.0", InstallStatus::Success, core_top);
    b.add_version("corelib", "5.0.0", InstallStatus::Success, core_top);

    b.add_requirement(rigid_v1, "corelib", "<3");
    b.add_requirement(flex_v2, "corelib", ">=3");
    b.add_requirement(flex_v1, "corelib", ">=1");

    let kg = b.build();
    let (d2, d3) = parsers();
    let out = infer(&kg, "import alpha_rigid\nimport zulu_flex\n", &d2, &d3).unwrap();

    assert_eq!(out.status, Status::Heuristic);
    let pairs = out.install_pairs.unwrap();
    let names: BTreeSet<&str> = pairs.iter().map(|p| p.package.as_str()).collect();
    assert!(names.contains("alpha-rigid"));
    assert!(names.contains("zulu-flex"));
    assert!(names.contains("corelib"));

    let zulu_version = pairs.iter().find(|p| p.package == "zulu-flex").unwrap();
    assert_eq!(zulu_version.version.as_ref().unwrap().to_string(), "1.0.0");
    let core_version = pairs.iter().find(|p| p.package == "corelib").unwrap();
    assert_eq!(core_version.version.as_ref().unwrap().to_string(), "2.9.0");
}

#[test]
fn infeasible_version_constraints_degrade_to_the_newest_version() {
    use std::collections::BTreeMap;

    let mut b = MemoryKgBuilder::new();
    let top = b.add_module("d", true);
    let d_old1 = b.add_version("d", "3.0.0", InstallStatus::Success, top);
    let d_old2 = b.add_version("d", "4.0.0", InstallStatus::Success, top);
    let d_new1 = b.add_version("d", "5.0.0", InstallStatus::Success, top);
    let d_new2 = b.add_version("d", "6.0.0", InstallStatus::Success, top);
    let kg = b.build();

    // Two slots pin the same package to disjoint version ranges — no
    // heuristic nor SAT assignment can satisfy both at once.
    let mut candidates: cre_ranker::CandidateLibraries = BTreeMap::new();
    let mut wants_new = BTreeMap::new();
    wants_new.insert("d".to_string(), BTreeSet::from([d_new1, d_new2]));
    candidates.insert("needs_new_d".to_string(), wants_new);
    let mut wants_old = BTreeMap::new();
    wants_old.insert("d".to_string(), BTreeSet::from([d_old1, d_old2]));
    candidates.insert("needs_old_d".to_string(), wants_old);

    let graph = cre_graph::build(&kg, &candidates).unwrap();
    assert!(cre_resolver::resolve(&graph).is_none());
    assert!(cre_sat::solve(&graph).unwrap().is_none());

    let degraded = cre_plan::best_effort(&graph);
    let plan = cre_plan::extract(&graph, &degraded);

    let d_pair = plan.pairs.iter().find(|p| p.package == "d").unwrap();
    assert_eq!(d_pair.version.as_ref().unwrap().to_string(), "6.0.0");
}
