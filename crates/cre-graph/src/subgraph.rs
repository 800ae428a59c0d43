//! The mutable selection state a backtracking search threads through a
//! [`crate::RequireGraph`] — spec.md §4.F's `subgraph`: a per-node record of
//! which out-neighbors and in-neighbors are currently chosen. Kept
//! independent of the static graph so the heuristic resolver, the SAT
//! fallback, and the install-plan extractor all consume the same shape.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::NodeId;

/// A snapshot of which edges are currently selected. Cheap to clone:
/// backtracking takes a snapshot before descending and only commits it back
/// up on success (spec.md §5's "copy-on-write graph snapshots").
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    out: FxHashMap<NodeId, BTreeSet<NodeId>>,
    inn: FxHashMap<NodeId, BTreeSet<NodeId>>,
}

impl Subgraph {
    /// Register `id` as present, even with no edges yet.
    pub fn ensure(&mut self, id: &NodeId) {
        self.out.entry(id.clone()).or_default();
        self.inn.entry(id.clone()).or_default();
    }

    /// Whether `id` has been registered at all.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.out.contains_key(id)
    }

    /// Record `parent → child` as selected.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) {
        self.ensure(&parent);
        self.ensure(&child);
        self.out.get_mut(&parent).unwrap().insert(child.clone());
        self.inn.get_mut(&child).unwrap().insert(parent);
    }

    /// Remove a previously selected `parent → child` edge, if present.
    pub fn remove_edge(&mut self, parent: &NodeId, child: &NodeId) {
        if let Some(set) = self.out.get_mut(parent) {
            set.remove(child);
        }
        if let Some(set) = self.inn.get_mut(child) {
            set.remove(parent);
        }
    }

    /// Currently selected out-neighbors of `id`.
    pub fn outgoing(&self, id: &NodeId) -> BTreeSet<NodeId> {
        self.out.get(id).cloned().unwrap_or_default()
    }

    /// Currently selected in-neighbors of `id`.
    pub fn incoming(&self, id: &NodeId) -> BTreeSet<NodeId> {
        self.inn.get(id).cloned().unwrap_or_default()
    }

    /// Every node currently registered, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.out.keys()
    }

    /// Drop nodes with neither incoming nor outgoing edges — the original's
    /// `clear_graph`, run once after a successful solve to discard
    /// registered-but-unconnected bookkeeping before plan extraction.
    pub fn prune_isolated(&mut self) {
        let isolated: Vec<NodeId> = self
            .out
            .iter()
            .filter(|(id, outs)| outs.is_empty() && self.inn[*id].is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        for id in isolated {
            self.out.remove(&id);
            self.inn.remove(&id);
        }
    }
}
