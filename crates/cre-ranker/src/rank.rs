//! Per-dialect candidate ranking (spec.md §4.C): queries the knowledge
//! graph for each [`ModuleSlot`] and produces a `module_score`/`attr_score`
//! pair plus the `candidate_libraries` map the graph builder consumes.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use cre_kg::{KgError, KnowledgeGraph, ModuleId, PackageId, VersionId};
use cre_parser::ParsedSnippet;
use rustc_hash::FxHashMap;

use crate::match_degree::{longest_submodule_prefix, match_degree};
use crate::slot::{build_forest, ModuleSlot};

/// A `top_module → { package → candidate version ids }` map; an empty
/// version set means "any version, package known but unconstrained".
pub type CandidateLibraries = BTreeMap<String, BTreeMap<PackageId, BTreeSet<VersionId>>>;

/// Ranking output for one dialect attempt.
#[derive(Debug, Clone, Default)]
pub struct RankOutcome {
    /// Sum, over slots with at least one matching module, of
    /// `best_module_match / |slot.modules|`.
    pub module_score: f64,
    /// Sum, over slots with at least one matching attribute, of
    /// `best_attr_match / |slot.attrs|`.
    pub attr_score: f64,
    /// Per-slot candidate packages and their admissible version ids.
    pub candidates: CandidateLibraries,
}

/// Rank every slot in `parsed` against `kg`, returning the combined score
/// and candidate map for this dialect attempt.
pub fn rank(kg: &dyn KnowledgeGraph, parsed: &ParsedSnippet) -> Result<RankOutcome, KgError> {
    let forest = build_forest(parsed);
    let mut outcome = RankOutcome::default();

    for (top_module, slot) in &forest {
        let candidates = rank_slot(kg, slot, &mut outcome.module_score, &mut outcome.attr_score)?;
        outcome.candidates.insert(top_module.clone(), candidates);
    }

    Ok(outcome)
}

fn rank_slot(
    kg: &dyn KnowledgeGraph,
    slot: &ModuleSlot,
    module_score: &mut f64,
    attr_score: &mut f64,
) -> Result<BTreeMap<PackageId, BTreeSet<VersionId>>, KgError> {
    let top_hits = kg.module_by_name(&slot.top_module)?;
    if top_hits.is_empty() {
        let homonym = cre_version::canonicalize_name(&slot.top_module);
        let mut candidates = BTreeMap::new();
        candidates.insert(homonym, BTreeSet::new());
        return Ok(candidates);
    }

    // Seed each candidate module's own submodule set with its own name
    // when it is itself importable, then extend with the BFS result.
    let mut query_modules: FxHashMap<ModuleId, BTreeSet<String>> = FxHashMap::default();
    for &(id, import_status) in &top_hits {
        let mut set = BTreeSet::new();
        if import_status {
            set.insert(slot.top_module.clone());
        }
        query_modules.insert(id, set);
    }

    let mut bfs_acc: FxHashMap<ModuleId, Vec<String>> = FxHashMap::default();
    for &(id, _) in &top_hits {
        kg.submodules_within(id, slot.max_hop, &mut bfs_acc)?;
    }
    for (id, names) in bfs_acc {
        query_modules
            .entry(id)
            .or_default()
            .extend(names);
    }

    let mut module_scores: FxHashMap<ModuleId, f64> = FxHashMap::default();
    let mut best_module_score = 0.0_f64;
    for (&id, submodules) in &query_modules {
        let score = match_degree(submodules, &slot.modules);
        module_scores.insert(id, score);
        if score > best_module_score {
            best_module_score = score;
        }
    }
    if best_module_score > 0.0 && !slot.modules.is_empty() {
        *module_score += best_module_score / slot.modules.len() as f64;
    }

    let module_best: Vec<ModuleId> = module_scores
        .iter()
        .filter(|(_, &s)| s == best_module_score)
        .map(|(&id, _)| id)
        .collect();

    let mut query_attrs: FxHashMap<ModuleId, BTreeSet<String>> = FxHashMap::default();
    let mut need_query_modules: BTreeSet<String> = BTreeSet::new();
    for &id in &module_best {
        let submodules = &query_modules[&id];
        let mut prefixes = BTreeSet::new();
        for attr in &slot.attrs {
            let prefix = longest_submodule_prefix(attr, submodules);
            prefixes.insert(prefix.clone());
            need_query_modules.insert(prefix);
        }
        query_attrs.insert(id, prefixes);
    }

    let mut attr_acc: FxHashMap<ModuleId, Vec<String>> = FxHashMap::default();
    if !need_query_modules.is_empty() {
        let module_id_list: Vec<ModuleId> = query_attrs.keys().copied().collect();
        let submodule_list: Vec<String> = need_query_modules.into_iter().collect();
        kg.attributes_of(&module_id_list, &submodule_list, &mut attr_acc)?;
    }

    let mut attr_scores: FxHashMap<ModuleId, f64> = FxHashMap::default();
    let mut best_attr_score = 0.0_f64;
    for &id in query_attrs.keys() {
        let found: BTreeSet<String> = attr_acc.get(&id).cloned().unwrap_or_default().into_iter().collect();
        let score = match_degree(&found, &slot.attrs);
        attr_scores.insert(id, score);
        if score > best_attr_score {
            best_attr_score = score;
        }
    }
    if best_attr_score > 0.0 && !slot.attrs.is_empty() {
        *attr_score += best_attr_score / slot.attrs.len() as f64;
    }

    let best_module_list: Vec<ModuleId> = attr_scores
        .iter()
        .filter(|(_, &s)| s == best_attr_score)
        .map(|(&id, _)| id)
        .collect();

    let candidates = kg.packages_versions_of(&best_module_list)?;
    Ok(candidates
        .into_iter()
        .map(|(pkg, versions)| (pkg, versions.into_iter().collect::<BTreeSet<_>>()))
        .collect())
}
