//! Groups a parsed snippet's three name sets into one forest node per
//! top-level dotted segment (spec.md §4.C).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use cre_parser::ParsedSnippet;

/// The OR choice point for one top-level imported identifier, carrying
/// everything the ranker needs to score candidates against it.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ModuleSlot {
    /// The first dotted segment, e.g. `numpy` out of `numpy.linalg.norm`.
    pub top_module: String,
    /// `imports ∪ resources` restricted to this slot.
    pub modules: BTreeSet<String>,
    /// `attrs ∪ resources` restricted to this slot.
    pub attrs: BTreeSet<String>,
    /// Deepest dotted-path depth observed across `modules` and `attrs`,
    /// i.e. `max(dots) `.
    pub max_hop: u32,
}

fn top_module_of(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

fn depth(name: &str) -> u32 {
    name.matches('.').count() as u32
}

/// Build one [`ModuleSlot`] per distinct top-level identifier observed in
/// `parsed`, ordered by first appearance of the top module name.
pub fn build_forest(parsed: &ParsedSnippet) -> BTreeMap<String, ModuleSlot> {
    let mut forest: BTreeMap<String, ModuleSlot> = BTreeMap::new();

    let module_names = parsed.imports.iter().chain(parsed.resources.iter());
    for name in module_names {
        let top = top_module_of(name).to_string();
        let slot = forest.entry(top.clone()).or_insert_with(|| ModuleSlot {
            top_module: top.clone(),
            ..Default::default()
        });
        slot.modules.insert(name.clone());
        slot.max_hop = slot.max_hop.max(depth(name));
    }

    let attr_names = parsed.attrs.iter().chain(parsed.resources.iter());
    for name in attr_names {
        let top = top_module_of(name).to_string();
        let slot = forest.entry(top.clone()).or_insert_with(|| ModuleSlot {
            top_module: top.clone(),
            ..Default::default()
        });
        slot.attrs.insert(name.clone());
        slot.max_hop = slot.max_hop.max(depth(name));
    }

    forest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_count_toward_both_modules_and_attrs() {
        let parsed = ParsedSnippet {
            imports: BTreeSet::from(["numpy".to_string()]),
            resources: BTreeSet::from(["requests.Session".to_string()]),
            attrs: BTreeSet::from(["numpy.linalg.norm".to_string()]),
        };
        let forest = build_forest(&parsed);
        assert!(forest["numpy"].modules.contains("numpy"));
        assert!(forest["numpy"].attrs.contains("numpy.linalg.norm"));
        assert_eq!(forest["numpy"].max_hop, 2);
        assert!(forest["requests"].modules.contains("requests.Session"));
        assert!(forest["requests"].attrs.contains("requests.Session"));
    }
}
