//! Aho-Corasick construction.
//!
//! Builds a trie over fixed-width patterns (shared prefixes merge, byte
//! classes split edges on partial overlap), then materializes the classical
//! failure function as explicit non-advancing default transitions, so the
//! execution engine needs no side structure.
//!
//! Output chains are shared: when a node's failure target accepts a suffix,
//! the node's chain tail is linked onto the target's chain instead of
//! copying it. The automata is marked `no_advance_no_output` so those shared
//! tails are not reported twice when execution falls back without consuming
//! input.

use std::collections::HashMap;

use dictum_core::{Automata, ByteSet, Edge, NodeId, OutputId};

/// A rejected dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("pattern has no elements")]
    EmptyPattern,

    #[error("pattern element {index} matches no bytes")]
    EmptyClass { index: usize },
}

/// Incremental Aho-Corasick builder.
///
/// Add every dictionary entry, then call [`finish`](Self::finish) once to
/// compute failure transitions and obtain the automata.
pub struct AhoCorasickBuilder {
    automata: Automata,
    /// Tail of each node's own output chain. Absent once the tail has been
    /// linked into a shared chain (linking may happen at most once per node).
    last_output: HashMap<NodeId, OutputId>,
}

impl AhoCorasickBuilder {
    pub fn new() -> Self {
        Self {
            automata: Automata::new(),
            last_output: HashMap::new(),
        }
    }

    /// Add an exact byte-string pattern.
    pub fn add_literal(&mut self, bytes: &[u8], output: Vec<u8>) -> Result<(), GenerateError> {
        let elements: Vec<ByteSet> = bytes.iter().map(|&b| ByteSet::singleton(b)).collect();
        self.add_pattern(&elements, output)
    }

    /// Add a fixed-width pattern of byte classes.
    ///
    /// Each element matches exactly one input byte. Class overlap with
    /// existing trie edges is resolved by splitting the edge and deep-copying
    /// the subtree below it, keeping the trie deterministic.
    pub fn add_pattern(
        &mut self,
        elements: &[ByteSet],
        output: Vec<u8>,
    ) -> Result<(), GenerateError> {
        if elements.is_empty() {
            return Err(GenerateError::EmptyPattern);
        }
        if let Some(index) = elements.iter().position(ByteSet::is_empty) {
            return Err(GenerateError::EmptyClass { index });
        }

        let mut current_nodes = vec![self.automata.start()];

        for element in elements {
            let mut next_nodes = Vec::new();

            for node in current_nodes {
                let mut cs = *element;

                // New edges are appended past this bound and must not be
                // reconsidered for the same element.
                let existing = self.automata.node(node).edges.len();
                for p in 0..existing {
                    if cs.is_empty() {
                        break;
                    }
                    let edge_set = self.automata.node(node).edges[p].matcher.as_set();
                    let shared = cs.intersection(&edge_set);
                    if shared.is_empty() {
                        continue;
                    }
                    cs = cs.difference(&shared);

                    if shared == edge_set {
                        next_nodes.push(self.automata.node(node).edges[p].target);
                    } else {
                        let to = self.split_edge(node, p, shared);
                        next_nodes.push(to);
                    }
                }

                // Whatever remains matches no existing edge: grow the trie.
                if !cs.is_empty() {
                    let fresh = self.automata.add_node();
                    self.automata
                        .node_mut(node)
                        .edges
                        .push(Edge::class(cs, true, fresh));
                    next_nodes.push(fresh);
                }
            }

            current_nodes = next_nodes;
        }

        for node in current_nodes {
            self.prepend_output(node, output.clone());
        }
        Ok(())
    }

    /// Compute failure transitions and return the finished automata.
    pub fn finish(mut self) -> Automata {
        let start = self.automata.start();
        self.automata.node_mut(start).default_target = Some(start);
        self.automata.node_mut(start).advance_on_default = true;
        self.automata.set_no_advance_no_output(true);

        self.process_failures();
        self.automata
    }

    /// Push `content` in front of `node`'s output chain.
    fn prepend_output(&mut self, node: NodeId, content: Vec<u8>) {
        let first = self.automata.node(node).first_output;
        let id = self.automata.add_output(content, first);
        self.automata.node_mut(node).first_output = Some(id);
        self.last_output.entry(node).or_insert(id);
    }

    /// Link `donor`'s output chain onto the tail of `node`'s chain.
    ///
    /// The donated chain is shared, not copied; afterwards `node`'s tail is
    /// sealed so it can never be linked a second time.
    fn append_outputs(&mut self, node: NodeId, donor: NodeId) {
        let Some(donor_first) = self.automata.node(donor).first_output else {
            return;
        };
        match self.last_output.remove(&node) {
            None => {
                debug_assert!(self.automata.node(node).first_output.is_none());
                self.automata.node_mut(node).first_output = Some(donor_first);
            }
            Some(last) => {
                self.automata.output_mut(last).next = Some(donor_first);
            }
        }
    }

    /// Split edge `p` of `node`: move `to_values` onto a new edge whose
    /// target is a deep copy of the old target's subtree. Returns the new
    /// edge's target.
    fn split_edge(&mut self, node: NodeId, p: usize, to_values: ByteSet) -> NodeId {
        let edge = self.automata.node(node).edges[p];
        let from_values = edge.matcher.as_set().difference(&to_values);
        debug_assert!(!to_values.is_empty());
        debug_assert!(!from_values.is_empty());
        debug_assert!(edge.advance);

        let copy = self.deep_copy(edge.target);
        self.automata.node_mut(node).edges[p].matcher =
            dictum_core::EdgeMatch::from_set(from_values);
        self.automata
            .node_mut(node)
            .edges
            .push(Edge::class(to_values, true, copy));
        copy
    }

    /// Deep-copy the subtree below `src`, output chains included.
    fn deep_copy(&mut self, src: NodeId) -> NodeId {
        let dst_head = self.automata.add_node();
        let mut todo = vec![(dst_head, src)];

        while let Some((dst, src)) = todo.pop() {
            if let Some(src_default) = self.automata.node(src).default_target {
                let dst_default = self.automata.add_node();
                self.automata.node_mut(dst).default_target = Some(dst_default);
                self.automata.node_mut(dst).advance_on_default =
                    self.automata.node(src).advance_on_default;
                todo.push((dst_default, src_default));
            }

            if self.automata.node(src).first_output.is_some() {
                let contents: Vec<Vec<u8>> = self
                    .automata
                    .output_chain(self.automata.node(src).first_output)
                    .map(|(_, o)| o.content.clone())
                    .collect();
                let mut next = None;
                let mut last = None;
                for content in contents.into_iter().rev() {
                    let id = self.automata.add_output(content, next);
                    if last.is_none() {
                        last = Some(id);
                    }
                    next = Some(id);
                }
                self.automata.node_mut(dst).first_output = next;
                if let Some(last) = last {
                    self.last_output.insert(dst, last);
                }
            }

            let edges = self.automata.node(src).edges.clone();
            for edge in edges {
                let child = self.automata.add_node();
                self.automata.node_mut(dst).edges.push(Edge {
                    matcher: edge.matcher,
                    advance: edge.advance,
                    target: child,
                });
                todo.push((child, edge.target));
            }
        }

        dst_head
    }

    /// Give `node` its failure fallback and adopt the fallback's outputs.
    fn set_default_target(&mut self, node: NodeId, target: NodeId) {
        debug_assert!(self.automata.node(node).default_target.is_none());
        self.automata.node_mut(node).default_target = Some(target);
        self.automata.node_mut(node).advance_on_default = false;
        self.append_outputs(node, target);
    }

    /// Breadth-first failure-link computation.
    ///
    /// For each trie node `s` reached from `r` on class `cs`, follow `r`'s
    /// fallback chain retrying `cs`; the first chain node with an edge
    /// covering part of `cs` supplies the fallback. Partial covers split the
    /// edge into `r` so each fragment can fail somewhere else.
    fn process_failures(&mut self) {
        let start = self.automata.start();
        let mut todo = std::collections::VecDeque::new();

        for i in 0..self.automata.node(start).edges.len() {
            let target = self.automata.node(start).edges[i].target;
            self.automata.node_mut(target).default_target = Some(start);
            self.automata.node_mut(target).advance_on_default = false;
            todo.push_back(target);
        }

        while let Some(r) = todo.pop_front() {
            let edge_count = self.automata.node(r).edges.len();
            for p in 0..edge_count {
                let s = self.automata.node(r).edges[p].target;
                let mut cs = self.automata.node(r).edges[p].matcher.as_set();
                debug_assert!(self.automata.node(s).default_target.is_none());
                todo.push_back(s);

                let mut current = self
                    .automata
                    .node(r)
                    .default_target
                    .expect("queued nodes have fallbacks");

                while !cs.is_empty() {
                    let current_edges = self.automata.node(current).edges.len();
                    for q in 0..current_edges {
                        let candidate_set = self.automata.node(current).edges[q].matcher.as_set();
                        let shared = cs.intersection(&candidate_set);
                        if shared.is_empty() {
                            continue;
                        }
                        let candidate_target = self.automata.node(current).edges[q].target;

                        if shared == cs {
                            // One fallback covers the whole class.
                            cs = ByteSet::new();
                            self.set_default_target(s, candidate_target);
                            break;
                        }

                        // Partial cover: carve the covered bytes out into
                        // their own edge (with a copied subtree) so they can
                        // take this fallback while the rest keeps looking.
                        let s2 = self.split_edge(r, p, shared);
                        todo.push_back(s2);
                        self.set_default_target(s2, candidate_target);

                        cs = cs.difference(&shared);
                        if cs.is_empty() {
                            break;
                        }
                    }

                    if !cs.is_empty() {
                        if current == start {
                            // The start fallback absorbs whatever is left.
                            self.set_default_target(s, start);
                            cs = ByteSet::new();
                        } else {
                            current = self
                                .automata
                                .node(current)
                                .default_target
                                .expect("fallback chains terminate at the start node");
                        }
                    }
                }
            }
        }
    }
}

impl Default for AhoCorasickBuilder {
    fn default() -> Self {
        Self::new()
    }
}
