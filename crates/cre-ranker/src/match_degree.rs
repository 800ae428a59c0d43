//! Partial dotted-path match scoring (spec.md §4.C.1).

use std::collections::BTreeSet;

/// Score `name_set` (names observed in source) against `tree_set` (names
/// known to exist in a candidate): exact membership scores 1; otherwise the
/// longest matching dotted prefix scores `1 - k/depth` where `k` is the
/// number of trailing segments stripped before a prefix lands in
/// `tree_set`. Zero if either set is empty.
pub fn match_degree(tree_set: &BTreeSet<String>, name_set: &BTreeSet<String>) -> f64 {
    if tree_set.is_empty() || name_set.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    for name in name_set {
        if tree_set.contains(name) {
            score += 1.0;
            continue;
        }
        let segments: Vec<&str> = name.split('.').collect();
        let depth = segments.len();
        let mut k = depth;
        for strip in 1..depth {
            let prefix = segments[..depth - strip].join(".");
            if tree_set.contains(&prefix) {
                k = strip;
                break;
            }
        }
        score += 1.0 - (k as f64) / (depth as f64);
    }
    score
}

/// The longest dotted prefix of `attr` present in `submodules`, per the
/// original's attribute-prefix query construction; falls back to the
/// top-level segment if no prefix matches (or to `attr` itself if it has
/// no dots at all).
pub fn longest_submodule_prefix(attr: &str, submodules: &BTreeSet<String>) -> String {
    let segments: Vec<&str> = attr.split('.').collect();
    if segments.len() <= 1 {
        return attr.to_string();
    }
    for i in 1..segments.len() {
        let prefix = segments[..segments.len() - i].join(".");
        if submodules.contains(&prefix) {
            return prefix;
        }
    }
    segments[0].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sets_score_zero() {
        assert_eq!(match_degree(&BTreeSet::new(), &BTreeSet::from(["a".into()])), 0.0);
        assert_eq!(match_degree(&BTreeSet::from(["a".into()]), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn exact_membership_scores_one() {
        let tree = BTreeSet::from(["numpy.linalg".to_string()]);
        let names = BTreeSet::from(["numpy.linalg".to_string()]);
        assert_eq!(match_degree(&tree, &names), 1.0);
    }

    #[test]
    fn partial_prefix_scores_proportionally() {
        let tree = BTreeSet::from(["numpy.linalg".to_string()]);
        let names = BTreeSet::from(["numpy.linalg.norm".to_string()]);
        // depth = 3 segments, k = 1 strip to reach "numpy.linalg".
        assert!((match_degree(&tree, &names) - (1.0 - 1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn no_matching_prefix_scores_zero() {
        let tree = BTreeSet::from(["numpy.fft".to_string()]);
        let names = BTreeSet::from(["numpy.linalg.norm".to_string()]);
        // depth = 3, no prefix matches at all, k stays at depth.
        assert_eq!(match_degree(&tree, &names), 0.0);
    }

    #[test]
    fn prefix_falls_back_to_top_segment() {
        let subs = BTreeSet::from(["numpy.fft".to_string()]);
        assert_eq!(longest_submodule_prefix("numpy.linalg.norm", &subs), "numpy");
    }

    #[test]
    fn single_segment_attr_is_its_own_prefix() {
        let subs: BTreeSet<String> = BTreeSet::new();
        assert_eq!(longest_submodule_prefix("numpy", &subs), "numpy");
    }
}
