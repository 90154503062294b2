use dictum_core::{ByteSet, validate};

use super::aho_corasick::{AhoCorasickBuilder, GenerateError};
use crate::test_utils::{assert_same_matches, brute_force, brute_force_classes, simulate};

fn literal_automata(words: &[&str]) -> dictum_core::Automata {
    let mut builder = AhoCorasickBuilder::new();
    for word in words {
        builder
            .add_literal(word.as_bytes(), word.as_bytes().to_vec())
            .unwrap();
    }
    builder.finish()
}

#[test]
fn empty_dictionary_is_minimal() {
    let a = AhoCorasickBuilder::new().finish();
    assert_eq!(a.num_nodes(), 1);
    let start = a.node(a.start());
    assert!(start.edges.is_empty());
    assert_eq!(start.default_target, Some(a.start()));
    assert!(start.advance_on_default);
    assert!(a.no_advance_no_output());
    assert_eq!(validate(&a), Ok(()));
}

#[test]
fn rejects_empty_pattern() {
    let mut builder = AhoCorasickBuilder::new();
    assert_eq!(
        builder.add_pattern(&[], b"x".to_vec()),
        Err(GenerateError::EmptyPattern)
    );
    assert_eq!(
        builder.add_literal(b"", b"x".to_vec()),
        Err(GenerateError::EmptyPattern)
    );
}

#[test]
fn rejects_empty_class_element() {
    let mut builder = AhoCorasickBuilder::new();
    let elements = [ByteSet::singleton(b'a'), ByteSet::new()];
    assert_eq!(
        builder.add_pattern(&elements, b"x".to_vec()),
        Err(GenerateError::EmptyClass { index: 1 })
    );
}

#[test]
fn generated_automata_validates() {
    let a = literal_automata(&["he", "she", "his", "hers"]);
    assert_eq!(validate(&a), Ok(()));
}

#[test]
fn classic_dictionary_scenario() {
    let a = literal_automata(&["he", "she", "his", "hers"]);
    let text = b"she saw his world as he saw hers...";

    let matches = simulate(&a, text);

    // Every pattern identity is recovered, "he" both standalone and inside
    // "she" / "hers". Positions are just past each pattern's last byte.
    let expected = vec![
        (3, b"he".to_vec()),
        (3, b"she".to_vec()),
        (11, b"his".to_vec()),
        (23, b"he".to_vec()),
        (30, b"he".to_vec()),
        (32, b"hers".to_vec()),
    ];
    assert_same_matches(matches.clone(), expected);

    let dictionary: Vec<(&[u8], &[u8])> = vec![
        (b"he".as_slice(), b"he".as_slice()),
        (b"she", b"she"),
        (b"his", b"his"),
        (b"hers", b"hers"),
    ];
    assert_same_matches(matches, brute_force(&dictionary, text));
}

#[test]
fn overlapping_occurrences_found() {
    let a = literal_automata(&["aa"]);
    let matches = simulate(&a, b"aaaa");
    assert_same_matches(
        matches,
        vec![(2, b"aa".to_vec()), (3, b"aa".to_vec()), (4, b"aa".to_vec())],
    );
}

#[test]
fn matches_equal_brute_force_on_assorted_texts() {
    let words = ["a", "ab", "bab", "bc", "bca", "c", "caa"];
    let a = literal_automata(&words);
    let dictionary: Vec<(&[u8], &[u8])> =
        words.iter().map(|w| (w.as_bytes(), w.as_bytes())).collect();

    for text in [
        b"abccab".as_slice(),
        b"bcaabab",
        b"",
        b"zzzz",
        b"cccaaabbbcab",
    ] {
        assert_same_matches(simulate(&a, text), brute_force(&dictionary, text));
    }
}

#[test]
fn class_patterns_split_edges() {
    let mut builder = AhoCorasickBuilder::new();
    // "[hs]e" overlaps the literal "he" on 'h'; the shared byte must keep
    // both outputs while 's' keeps only the class output.
    builder.add_literal(b"he", b"lit".to_vec()).unwrap();
    let class_pattern = [ByteSet::from_bytes([b'h', b's']), ByteSet::singleton(b'e')];
    builder.add_pattern(&class_pattern, b"cls".to_vec()).unwrap();
    let a = builder.finish();
    assert_eq!(validate(&a), Ok(()));

    let dictionary: Vec<(&[ByteSet], &[u8])> = vec![(&class_pattern, b"cls".as_slice())];
    let text = b"he se xe";
    let mut expected = brute_force_classes(&dictionary, text);
    expected.extend(brute_force(&[(b"he".as_slice(), b"lit".as_slice())], text));
    assert_same_matches(simulate(&a, text), expected);
}

#[test]
fn digit_class_pattern() {
    let mut builder = AhoCorasickBuilder::new();
    let pattern = [
        ByteSet::singleton(b'v'),
        ByteSet::range(b'0', b'9'),
        ByteSet::range(b'0', b'9'),
    ];
    builder.add_pattern(&pattern, b"ver".to_vec()).unwrap();
    let a = builder.finish();

    let dictionary: Vec<(&[ByteSet], &[u8])> = vec![(&pattern, b"ver".as_slice())];
    for text in [b"v12 v9 vv42 v00".as_slice(), b"v123", b"xv55x"] {
        assert_same_matches(simulate(&a, text), brute_force_classes(&dictionary, text));
    }
}

#[test]
fn suffix_outputs_are_shared_not_copied() {
    let a = literal_automata(&["he", "she"]);

    // Find the "she" terminal: its chain must be exactly ["she", "he"] and
    // the "he" element must be the same stored output the "he" terminal uses.
    let mut she_chain = None;
    let mut he_first = None;
    for id in a.node_ids() {
        let chain: Vec<_> = a
            .output_chain(a.node(id).first_output)
            .map(|(oid, o)| (oid, o.content.clone()))
            .collect();
        match chain.as_slice() {
            [(_, she), (he_id, he)] if she == b"she" && he == b"he" => {
                she_chain = Some(*he_id);
            }
            [(he_id, he)] if he == b"he" => he_first = Some(*he_id),
            _ => {}
        }
    }
    let (shared, own) = (she_chain.expect("she terminal"), he_first.expect("he terminal"));
    assert_eq!(shared, own);
}

#[test]
fn failure_links_are_nonadvancing_defaults() {
    let a = literal_automata(&["he", "she"]);
    // Every node except start must have a default; only start advances on it.
    for id in a.node_ids() {
        let node = a.node(id);
        assert!(node.default_target.is_some(), "node {id:?} lacks a default");
        if id == a.start() {
            assert!(node.advance_on_default);
        } else {
            assert!(!node.advance_on_default);
        }
    }
}
