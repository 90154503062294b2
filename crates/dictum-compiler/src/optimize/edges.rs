//! Edge canonicalization.
//!
//! Merges each node's explicit edges into one edge per (target, advance)
//! pair, drops shadowed and empty edges, and orders edges by their lowest
//! byte. Lookup semantics are unchanged; the compiler gets denser classes
//! and a deterministic layout order.

use std::collections::BTreeMap;

use dictum_core::{Automata, ByteSet, Edge, EdgeMatch, NodeId};

/// Canonicalize every node's edge list. Returns the number of nodes changed.
pub fn canonicalize_edges(automata: &mut Automata) -> usize {
    let mut changed = 0;
    for id in automata.node_ids() {
        if canonicalize_node(automata, id) {
            changed += 1;
        }
    }
    changed
}

/// Canonicalize one node. Returns true if the edge list changed.
pub(crate) fn canonicalize_node(automata: &mut Automata, id: NodeId) -> bool {
    let node = automata.node(id);

    // Honor first-match-wins while merging: a byte belongs to the first edge
    // that matches it.
    let mut claimed = ByteSet::new();
    let mut merged: BTreeMap<(u32, bool), ByteSet> = BTreeMap::new();
    for edge in &node.edges {
        let effective = edge.matcher.as_set().difference(&claimed);
        if effective.is_empty() {
            continue;
        }
        claimed = claimed.union(&effective);
        let entry = merged
            .entry((edge.target.as_u32(), edge.advance))
            .or_default();
        *entry = entry.union(&effective);
    }

    let mut rebuilt: Vec<Edge> = merged
        .into_iter()
        .map(|((target, advance), set)| Edge {
            matcher: EdgeMatch::from_set(set),
            advance,
            target: NodeId::from_raw(target),
        })
        .collect();
    rebuilt.sort_by_key(|e| e.matcher.as_set().min());

    if rebuilt == node.edges {
        return false;
    }
    automata.node_mut(id).edges = rebuilt;
    true
}
