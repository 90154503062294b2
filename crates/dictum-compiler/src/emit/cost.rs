//! Per-node byte cost model.
//!
//! For every node the emitter prices the two dispatch encodings and keeps
//! the cheaper one (after weighting). The numbers here must agree exactly
//! with what the record writers append; the emitter asserts as much.

use dictum_core::{Automata, NodeId, Transition};

/// Collapse runs of identical targets once more than this many table entries
/// repeat their predecessor.
pub(crate) const RUN_THRESHOLD: usize = 32;

/// Everything the emitter needs to know to price and encode one node.
pub(crate) struct NodeOracle {
    /// (byte, transition) entries stored explicitly: resolved per-byte
    /// transitions that differ from the node's default behavior, ascending
    /// by byte.
    pub entries: Vec<(u8, Transition)>,
    /// Entries whose target repeats the previous entry's target.
    pub num_consecutive: usize,
    pub has_nonadvancing: bool,
    pub use_runs: bool,
    pub low_cost: usize,
    pub high_cost: usize,
}

impl NodeOracle {
    pub fn new(automata: &Automata, id: NodeId, id_width: u8) -> Self {
        let node = automata.node(id);
        let table = automata.targets_by_input(id);
        let default = node.default_target.map(|target| Transition {
            target,
            advance: node.advance_on_default,
        });

        let mut entries = Vec::new();
        let mut num_consecutive = 0;
        let mut previous_target = None;
        for (c, entry) in table.iter().enumerate() {
            let Some(t) = entry else { continue };
            if Some(*t) == default {
                continue;
            }
            if previous_target == Some(t.target) {
                num_consecutive += 1;
            }
            previous_target = Some(t.target);
            entries.push((c as u8, *t));
        }

        let has_nonadvancing = entries.iter().any(|(_, t)| !t.advance);
        let use_runs = num_consecutive > RUN_THRESHOLD;

        let w = id_width as usize;
        let degree = entries.len();
        let has_output = node.first_output.is_some();
        let has_default = default.is_some();

        let mut low_cost = 1;
        if has_output {
            low_cost += w;
        }
        if degree > 0 {
            low_cost += 1;
        }
        if has_default {
            low_cost += w;
        }
        if has_nonadvancing && degree > 0 {
            low_cost += degree.div_ceil(8);
        }
        low_cost += degree * (1 + w);

        let mut high_cost = 1;
        if has_output {
            high_cost += w;
        }
        if has_default {
            high_cost += w;
        }
        if has_nonadvancing {
            high_cost += 32;
        }
        if degree < 256 {
            high_cost += 32;
        }
        if use_runs {
            high_cost += 32;
            high_cost += w * (degree - num_consecutive);
        } else {
            high_cost += w * degree;
        }

        Self {
            entries,
            num_consecutive,
            has_nonadvancing,
            use_runs,
            low_cost,
            high_cost,
        }
    }

    pub fn degree(&self) -> usize {
        self.entries.len()
    }

    /// Pick the high encoding when its weighted cost does not exceed the low
    /// cost. A low record indexes its degree with one byte, so 256 explicit
    /// entries force the high encoding outright.
    pub fn prefer_high(&self, high_node_weight: f64) -> bool {
        if self.degree() > 255 {
            return true;
        }
        self.high_cost as f64 * high_node_weight <= self.low_cost as f64
    }
}
