//! Output deduplication.
//!
//! Partitions output chains by structural equality (content plus canonical
//! successor) and rewrites every reference to the class representative,
//! shrinking the compiled output block. Runs to a fixed point so chains that
//! become equal after their tails merge collapse too.

use std::collections::HashMap;

use dictum_core::{Automata, OutputId};

/// Deduplicate structurally identical output chains.
///
/// Returns the number of references rewritten. Orphaned storage stays in the
/// arena; the emitter only lays out reachable outputs.
pub fn deduplicate_outputs(automata: &mut Automata) -> usize {
    let mut total = 0;

    loop {
        // Representative per (content, next): the lowest id wins, so the
        // assignment is deterministic.
        let mut canonical: HashMap<(Vec<u8>, Option<OutputId>), OutputId> = HashMap::new();
        let mut remap: Vec<OutputId> = Vec::with_capacity(automata.num_outputs());
        for id in automata.output_ids() {
            let output = automata.output(id);
            let key = (output.content.clone(), output.next);
            let representative = *canonical.entry(key).or_insert(id);
            remap.push(representative);
        }

        let mut changes = 0;
        for id in automata.output_ids() {
            if let Some(next) = automata.output(id).next {
                let target = remap[next.index()];
                if target != next {
                    automata.output_mut(id).next = Some(target);
                    changes += 1;
                }
            }
        }
        for id in automata.node_ids() {
            if let Some(first) = automata.node(id).first_output {
                let target = remap[first.index()];
                if target != first {
                    automata.node_mut(id).first_output = Some(target);
                    changes += 1;
                }
            }
        }

        if changes == 0 {
            return total;
        }
        total += changes;
    }
}
