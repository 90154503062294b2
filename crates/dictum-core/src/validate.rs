//! Structural validation of an intermediate automata.
//!
//! Compilation refuses malformed graphs up front: dangling ids, ambiguous
//! byte dispatch, and cycles that would let execution spin without consuming
//! input. Validation is read-only and reports the first fault found with
//! enough context to locate it.

use crate::automata::{Automata, NodeId, OutputId};

/// A malformed intermediate automata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("node {node:?} has an edge targeting out-of-range node {target}")]
    DanglingEdge { node: NodeId, target: u32 },

    #[error("node {node:?} has a default targeting out-of-range node {target}")]
    DanglingDefault { node: NodeId, target: u32 },

    #[error("node {node:?} references out-of-range output {output}")]
    DanglingOutput { node: NodeId, output: u32 },

    #[error("output {output:?} links to out-of-range output {next}")]
    DanglingOutputLink { output: OutputId, next: u32 },

    #[error("node {node:?} has an edge with an empty match class")]
    EmptyMatch { node: NodeId },

    #[error("node {node:?} maps byte {byte:#04x} to more than one transition")]
    Nondeterministic { node: NodeId, byte: u8 },

    #[error("non-advancing transitions cycle through node {node:?}")]
    NonadvancingCycle { node: NodeId },

    #[error("output chain starting at {output:?} is cyclic")]
    OutputCycle { output: OutputId },

    #[error("start node {start} is out of range")]
    InvalidStart { start: u32 },
}

/// Check all structural invariants.
pub fn validate(automata: &Automata) -> Result<(), StructuralError> {
    let num_nodes = automata.num_nodes() as u32;
    let num_outputs = automata.num_outputs() as u32;

    if automata.start().as_u32() >= num_nodes {
        return Err(StructuralError::InvalidStart {
            start: automata.start().as_u32(),
        });
    }

    for id in automata.node_ids() {
        let node = automata.node(id);

        for edge in &node.edges {
            if edge.target.as_u32() >= num_nodes {
                return Err(StructuralError::DanglingEdge {
                    node: id,
                    target: edge.target.as_u32(),
                });
            }
            if edge.matcher.is_empty() {
                return Err(StructuralError::EmptyMatch { node: id });
            }
        }

        if let Some(target) = node.default_target
            && target.as_u32() >= num_nodes
        {
            return Err(StructuralError::DanglingDefault {
                node: id,
                target: target.as_u32(),
            });
        }

        if let Some(output) = node.first_output
            && output.as_u32() >= num_outputs
        {
            return Err(StructuralError::DanglingOutput {
                node: id,
                output: output.as_u32(),
            });
        }

        check_deterministic(automata, id)?;
    }

    for id in automata.output_ids() {
        if let Some(next) = automata.output(id).next
            && next.as_u32() >= num_outputs
        {
            return Err(StructuralError::DanglingOutputLink {
                output: id,
                next: next.as_u32(),
            });
        }
    }

    check_output_chains(automata)?;
    check_nonadvancing_acyclic(automata)?;

    Ok(())
}

/// At most one distinct (target, advance) per input byte.
///
/// Duplicate edges that agree on both are tolerated; edge canonicalization
/// merges them.
fn check_deterministic(automata: &Automata, id: NodeId) -> Result<(), StructuralError> {
    let node = automata.node(id);
    if node.edges.len() < 2 {
        return Ok(());
    }

    let mut claimed: [Option<(NodeId, bool)>; 256] = [None; 256];
    for edge in &node.edges {
        for b in edge.matcher.iter() {
            match claimed[b as usize] {
                None => claimed[b as usize] = Some((edge.target, edge.advance)),
                Some(existing) => {
                    if existing != (edge.target, edge.advance) {
                        return Err(StructuralError::Nondeterministic { node: id, byte: b });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Every output chain must terminate.
fn check_output_chains(automata: &Automata) -> Result<(), StructuralError> {
    // Three-color walk over the `next` links; each output has at most one
    // successor, so a gray hit is always a cycle.
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    let mut color = vec![WHITE; automata.num_outputs()];
    for id in automata.output_ids() {
        if color[id.index()] != WHITE {
            continue;
        }
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            match color[cur.index()] {
                BLACK => break,
                GRAY => {
                    return Err(StructuralError::OutputCycle { output: id });
                }
                _ => {}
            }
            color[cur.index()] = GRAY;
            path.push(cur);
            current = automata.output(cur).next;
        }
        for visited in path {
            color[visited.index()] = BLACK;
        }
    }
    Ok(())
}

/// Chains of non-advancing transitions must be acyclic.
fn check_nonadvancing_acyclic(automata: &Automata) -> Result<(), StructuralError> {
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    let nonadvancing_successors = |id: NodeId| {
        let node = automata.node(id);
        let mut succ: Vec<NodeId> = node
            .edges
            .iter()
            .filter(|e| !e.advance)
            .map(|e| e.target)
            .collect();
        if let Some(target) = node.default_target
            && !node.advance_on_default
        {
            succ.push(target);
        }
        succ
    };

    let mut color = vec![WHITE; automata.num_nodes()];
    for root in automata.node_ids() {
        if color[root.index()] != WHITE {
            continue;
        }
        // Iterative DFS with explicit enter/leave frames.
        let mut stack = vec![(root, false)];
        while let Some((id, leaving)) = stack.pop() {
            if leaving {
                color[id.index()] = BLACK;
                continue;
            }
            if color[id.index()] != WHITE {
                // Duplicate frame from a sibling push.
                continue;
            }
            color[id.index()] = GRAY;
            stack.push((id, true));
            for succ in nonadvancing_successors(id) {
                match color[succ.index()] {
                    GRAY => {
                        return Err(StructuralError::NonadvancingCycle { node: succ });
                    }
                    WHITE => stack.push((succ, false)),
                    _ => {}
                }
            }
        }
    }
    Ok(())
}
