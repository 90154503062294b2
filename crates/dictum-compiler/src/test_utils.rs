//! Shared helpers for compiler tests.

use dictum_core::{Automata, ByteSet};

/// Reference walk over the intermediate automata.
///
/// Implements the execution contract directly on the graph: emit outputs on
/// entry (suppressed on non-advancing entry when the automata says so),
/// follow explicit edges before the default, stop on a dead end.
pub fn simulate(automata: &Automata, input: &[u8]) -> Vec<(u64, Vec<u8>)> {
    let mut results = Vec::new();
    let mut node = automata.start();
    let mut pos = 0usize;
    let mut idle_steps = 0usize;

    let emit = |node, pos: usize, results: &mut Vec<(u64, Vec<u8>)>| {
        for (_, output) in automata.output_chain(automata.node(node).first_output) {
            results.push((pos as u64, output.content.clone()));
        }
    };

    // First entry into the start node, before any input.
    emit(node, 0, &mut results);

    while pos < input.len() {
        let Some(t) = automata.transition_for(node, input[pos]) else {
            break;
        };
        node = t.target;
        if t.advance {
            pos += 1;
            idle_steps = 0;
        } else {
            idle_steps += 1;
            assert!(
                idle_steps <= automata.num_nodes(),
                "non-advancing loop in test automata"
            );
        }
        if t.advance || !automata.no_advance_no_output() {
            emit(node, pos, &mut results);
        }
    }

    results
}

/// Brute-force reference scan for literal dictionaries.
pub fn brute_force(dictionary: &[(&[u8], &[u8])], text: &[u8]) -> Vec<(u64, Vec<u8>)> {
    let classes: Vec<(Vec<ByteSet>, &[u8])> = dictionary
        .iter()
        .map(|(pattern, output)| {
            (
                pattern.iter().map(|&b| ByteSet::singleton(b)).collect(),
                *output,
            )
        })
        .collect();
    let borrowed: Vec<(&[ByteSet], &[u8])> = classes
        .iter()
        .map(|(p, o)| (p.as_slice(), *o))
        .collect();
    brute_force_classes(&borrowed, text)
}

/// Brute-force reference scan for class patterns.
pub fn brute_force_classes(dictionary: &[(&[ByteSet], &[u8])], text: &[u8]) -> Vec<(u64, Vec<u8>)> {
    let mut results = Vec::new();
    for &(pattern, output) in dictionary {
        if pattern.is_empty() || pattern.len() > text.len() {
            continue;
        }
        for start in 0..=text.len() - pattern.len() {
            let hit = pattern
                .iter()
                .zip(&text[start..start + pattern.len()])
                .all(|(class, &b)| class.contains(b));
            if hit {
                results.push(((start + pattern.len()) as u64, output.to_vec()));
            }
        }
    }
    results
}

/// Order-insensitive comparison of (position, payload) match sets.
pub fn assert_same_matches(mut actual: Vec<(u64, Vec<u8>)>, mut expected: Vec<(u64, Vec<u8>)>) {
    actual.sort();
    expected.sort();
    assert_eq!(actual, expected);
}
