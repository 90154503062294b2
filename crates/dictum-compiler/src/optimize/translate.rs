//! Non-advancing transition elimination.
//!
//! Two variants over the same idea: a transition that does not consume input
//! only shuttles the machine along its fallback chain, so it can be replaced
//! by whatever transition the chain ends up taking for that byte.
//!
//! [`translate_nonadvancing`] resolves every such transition by rebuilding
//! the node's dispatch per input byte (the default gets folded into explicit
//! edges), guaranteeing one consumed byte per step afterwards at the price
//! of denser nodes. [`translate_nonadvancing_structural`] only rewrites a
//! transition in place when its target already dispatches uniformly, so the
//! node count and shape never grow.
//!
//! A transition whose target would emit outputs on entry is left alone
//! unless the automata suppresses outputs on non-advancing entry anyway.

use dictum_core::{Automata, ByteSet, Edge, EdgeMatch, Transition};

use super::edges::canonicalize_node;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptimizeError {
    #[error("non-advancing elimination did not settle after {rounds} rounds")]
    TranslationDiverged { rounds: usize },
}

/// Would entering `target` without consuming input emit anything?
fn entry_is_silent(automata: &Automata, target: dictum_core::NodeId) -> bool {
    automata.node(target).first_output.is_none() || automata.no_advance_no_output()
}

/// Eliminate all non-advancing transitions.
///
/// Returns the number of per-byte rewrites performed. Fails rather than
/// spins if the graph keeps producing new non-advancing transitions (a
/// cyclic chain; `validate` rejects those up front).
pub fn translate_nonadvancing(automata: &mut Automata) -> Result<usize, OptimizeError> {
    let mut operations = 0;
    // Each round shortens every surviving chain by one hop, so rounds are
    // bounded by the longest chain in a well-formed graph.
    let max_rounds = automata.num_nodes() + 2;
    let mut rounds = 0;

    loop {
        let mut round_changed = false;

        for id in automata.breadth_first() {
            let table = automata.targets_by_input(id);
            let mut rebuilt = table;
            let mut touched = false;

            for c in 0..256usize {
                let Some(t) = table[c] else { continue };
                if t.advance {
                    continue;
                }
                if !entry_is_silent(automata, t.target) {
                    continue;
                }
                match automata.transition_for(t.target, c as u8) {
                    None => {
                        // The chain dead-ends; so does this byte.
                        rebuilt[c] = None;
                        touched = true;
                        operations += 1;
                    }
                    Some(next) => {
                        rebuilt[c] = Some(next);
                        touched = true;
                        operations += 1;
                    }
                }
            }

            if touched {
                replace_dispatch(automata, id, &rebuilt);
                round_changed = true;
            }
        }

        if !round_changed {
            return Ok(operations);
        }
        rounds += 1;
        if rounds > max_rounds {
            return Err(OptimizeError::TranslationDiverged { rounds });
        }
    }
}

/// Rewrite a node's dispatch from a per-byte table, folding the default into
/// explicit edges, then re-canonicalize.
fn replace_dispatch(automata: &mut Automata, id: dictum_core::NodeId, table: &[Option<Transition>; 256]) {
    let node = automata.node_mut(id);
    node.edges.clear();
    node.default_target = None;
    node.advance_on_default = false;
    for (c, entry) in table.iter().enumerate() {
        if let Some(t) = entry {
            node.edges.push(Edge {
                matcher: EdgeMatch::Byte(c as u8),
                advance: t.advance,
                target: t.target,
            });
        }
    }
    canonicalize_node(automata, id);
}

/// The uniform follow-up transition of `target` across `inputs`, if one
/// exists and entering `target` emits nothing.
fn find_next_target(
    automata: &Automata,
    inputs: &ByteSet,
    target: dictum_core::NodeId,
) -> Option<Transition> {
    if !entry_is_silent(automata, target) {
        return None;
    }
    let mut result: Option<Transition> = None;
    for c in inputs.iter() {
        let candidate = automata.transition_for(target, c)?;
        match result {
            None => result = Some(candidate),
            Some(existing) if existing != candidate => return None,
            Some(_) => {}
        }
    }
    result
}

/// Eliminate non-advancing transitions only where the rewrite is free.
///
/// Edges and defaults are redirected in place when their target dispatches
/// every relevant byte to one place; nothing else changes, so the automata
/// never grows. Returns the number of rewrites.
pub fn translate_nonadvancing_structural(automata: &mut Automata) -> usize {
    let mut operations = 0;
    // Every rewrite is individually semantics-preserving, so on a graph with
    // cyclic chains (which validation rejects) the pass may simply stop once
    // the round bound is hit.
    let max_rounds = automata.num_nodes() + 2;
    let mut rounds = 0;

    loop {
        let mut changed = false;

        for id in automata.breadth_first() {
            let mut default_inputs = ByteSet::full();

            for p in 0..automata.node(id).edges.len() {
                let edge = automata.node(id).edges[p];
                let inputs = edge.matcher.as_set();
                default_inputs = default_inputs.difference(&inputs);
                if edge.advance {
                    continue;
                }
                if let Some(next) = find_next_target(automata, &inputs, edge.target) {
                    let e = &mut automata.node_mut(id).edges[p];
                    e.target = next.target;
                    e.advance = next.advance;
                    operations += 1;
                    changed = true;
                }
            }

            let node = automata.node(id);
            if let Some(default) = node.default_target
                && !node.advance_on_default
                && !default_inputs.is_empty()
                && let Some(next) = find_next_target(automata, &default_inputs, default)
            {
                let node = automata.node_mut(id);
                node.default_target = Some(next.target);
                node.advance_on_default = next.advance;
                operations += 1;
                changed = true;
            }
        }

        rounds += 1;
        if !changed || rounds > max_rounds {
            return operations;
        }
    }
}
