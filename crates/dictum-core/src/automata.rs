//! The intermediate automata graph.
//!
//! Nodes live in an arena and are addressed by `NodeId`; outputs live in a
//! second arena addressed by `OutputId`. Output payloads form shared singly
//! linked chains so that several nodes can reference one stored sequence.
//!
//! A node's fallback transition (taken when no explicit edge matches) is the
//! node-level `default_target` slot rather than an edge, mirroring how the
//! compiled form encodes it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::byte_set::{ByteSet, ByteSetIter};

/// Index of a node in the automata's node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an output in the automata's output arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputId(u32);

impl OutputId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What an explicit edge matches: a single byte or a class of bytes.
///
/// The fallback case has no match criterion and is represented by the node's
/// `default_target`, not by an `EdgeMatch` variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeMatch {
    Byte(u8),
    Class(ByteSet),
}

impl EdgeMatch {
    /// Normalized constructor: singletons become `Byte`.
    pub fn from_set(set: ByteSet) -> Self {
        match (set.len(), set.min()) {
            (1, Some(b)) => Self::Byte(b),
            _ => Self::Class(set),
        }
    }

    pub fn contains(&self, b: u8) -> bool {
        match self {
            Self::Byte(m) => *m == b,
            Self::Class(set) => set.contains(b),
        }
    }

    /// Number of bytes matched.
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(_) => 1,
            Self::Class(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_set(&self) -> ByteSet {
        match self {
            Self::Byte(b) => ByteSet::singleton(*b),
            Self::Class(set) => *set,
        }
    }

    /// Iterate matched bytes in ascending order.
    pub fn iter(&self) -> ByteSetIter {
        self.as_set().iter()
    }
}

/// An explicit transition out of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub matcher: EdgeMatch,
    /// True if taking this edge consumes one input byte.
    pub advance: bool,
    pub target: NodeId,
}

impl Edge {
    pub fn byte(b: u8, advance: bool, target: NodeId) -> Self {
        Self {
            matcher: EdgeMatch::Byte(b),
            advance,
            target,
        }
    }

    pub fn class(set: ByteSet, advance: bool, target: NodeId) -> Self {
        Self {
            matcher: EdgeMatch::from_set(set),
            advance,
            target,
        }
    }
}

/// A state in the automata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub edges: Vec<Edge>,
    /// Fallback taken when no explicit edge matches the current byte.
    pub default_target: Option<NodeId>,
    pub advance_on_default: bool,
    /// Head of this node's output chain, emitted each time the node is
    /// entered.
    pub first_output: Option<OutputId>,
}

/// One output payload; `next` links chains shared between nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub content: Vec<u8>,
    pub next: Option<OutputId>,
}

/// A resolved transition: where to go and whether input is consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub target: NodeId,
    pub advance: bool,
}

/// The mutable intermediate automata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Automata {
    nodes: Vec<Node>,
    outputs: Vec<Output>,
    start: NodeId,
    no_advance_no_output: bool,
    metadata: IndexMap<String, Vec<u8>>,
}

impl Automata {
    /// A minimal automata: a single start node with no edges.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            outputs: Vec::new(),
            start: NodeId(0),
            no_advance_no_output: false,
            metadata: IndexMap::new(),
        }
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::default());
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn add_output(&mut self, content: Vec<u8>, next: Option<OutputId>) -> OutputId {
        let id = OutputId(self.outputs.len() as u32);
        self.outputs.push(Output { content, next });
        id
    }

    pub fn output(&self, id: OutputId) -> &Output {
        &self.outputs[id.index()]
    }

    pub fn output_mut(&mut self, id: OutputId) -> &mut Output {
        &mut self.outputs[id.index()]
    }

    pub fn output_ids(&self) -> impl Iterator<Item = OutputId> + use<> {
        (0..self.outputs.len() as u32).map(OutputId)
    }

    /// When set, entering a node without consuming input does not emit the
    /// node's outputs. Constructions that share output chains through
    /// fallback links rely on this to avoid double reporting.
    pub fn no_advance_no_output(&self) -> bool {
        self.no_advance_no_output
    }

    pub fn set_no_advance_no_output(&mut self, value: bool) {
        self.no_advance_no_output = value;
    }

    /// Opaque side information, carried through compilation unchanged.
    pub fn metadata(&self) -> &IndexMap<String, Vec<u8>> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut IndexMap<String, Vec<u8>> {
        &mut self.metadata
    }

    /// Resolve the transition for `byte` at `node`: the first matching
    /// explicit edge, else the default.
    pub fn transition_for(&self, node: NodeId, byte: u8) -> Option<Transition> {
        let n = self.node(node);
        for edge in &n.edges {
            if edge.matcher.contains(byte) {
                return Some(Transition {
                    target: edge.target,
                    advance: edge.advance,
                });
            }
        }
        n.default_target.map(|target| Transition {
            target,
            advance: n.advance_on_default,
        })
    }

    /// Resolved transition per input byte, defaults included.
    pub fn targets_by_input(&self, node: NodeId) -> [Option<Transition>; 256] {
        let n = self.node(node);
        let default = n.default_target.map(|target| Transition {
            target,
            advance: n.advance_on_default,
        });
        let mut table = [default; 256];
        // Later edges never override earlier ones (first match wins).
        for edge in n.edges.iter().rev() {
            for b in edge.matcher.iter() {
                table[b as usize] = Some(Transition {
                    target: edge.target,
                    advance: edge.advance,
                });
            }
        }
        table
    }

    /// Nodes reachable from the start node, in breadth-first order.
    ///
    /// Explicit edge targets are visited before the default target, matching
    /// the traversal the compiler lays records out in.
    pub fn breadth_first(&self) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut queue = std::collections::VecDeque::new();

        seen[self.start.index()] = true;
        queue.push_back(self.start);

        while let Some(id) = queue.pop_front() {
            order.push(id);
            let node = self.node(id);
            for edge in &node.edges {
                if !seen[edge.target.index()] {
                    seen[edge.target.index()] = true;
                    queue.push_back(edge.target);
                }
            }
            if let Some(target) = node.default_target
                && !seen[target.index()]
            {
                seen[target.index()] = true;
                queue.push_back(target);
            }
        }

        order
    }

    /// Walk an output chain in emission order.
    ///
    /// The walk is capped at the arena size so a corrupted chain cannot spin
    /// forever; `validate` reports such chains as structural errors.
    pub fn output_chain(&self, first: Option<OutputId>) -> OutputChain<'_> {
        OutputChain {
            automata: self,
            current: first,
            remaining: self.outputs.len(),
        }
    }

    /// Drop nodes unreachable from the start node, remapping ids.
    ///
    /// Returns the number of nodes removed.
    pub fn remove_unreachable(&mut self) -> usize {
        let reachable = self.breadth_first();
        if reachable.len() == self.nodes.len() {
            return 0;
        }

        let mut remap = vec![None; self.nodes.len()];
        for (new_index, id) in reachable.iter().enumerate() {
            remap[id.index()] = Some(NodeId(new_index as u32));
        }

        let old_nodes = std::mem::take(&mut self.nodes);
        let removed = old_nodes.len() - reachable.len();
        self.nodes = reachable
            .iter()
            .map(|id| old_nodes[id.index()].clone())
            .collect();

        for node in &mut self.nodes {
            for edge in &mut node.edges {
                edge.target = remap[edge.target.index()]
                    .expect("edge of a reachable node points at a reachable node");
            }
            if let Some(target) = node.default_target {
                node.default_target = Some(
                    remap[target.index()]
                        .expect("default of a reachable node points at a reachable node"),
                );
            }
        }
        self.start = remap[self.start.index()].expect("start node is reachable");

        removed
    }
}

impl Default for Automata {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over an output chain.
pub struct OutputChain<'a> {
    automata: &'a Automata,
    current: Option<OutputId>,
    remaining: usize,
}

impl<'a> Iterator for OutputChain<'a> {
    type Item = (OutputId, &'a Output);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let output = self.automata.output(id);
        self.current = output.next;
        Some((id, output))
    }
}
