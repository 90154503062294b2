use dictum_core::Automata;

use super::outputs::deduplicate_outputs;

#[test]
fn collapses_identical_singles() {
    let mut a = Automata::new();
    let start = a.start();
    let n = a.add_node();
    let o1 = a.add_output(b"hit".to_vec(), None);
    let o2 = a.add_output(b"hit".to_vec(), None);
    a.node_mut(start).first_output = Some(o1);
    a.node_mut(n).first_output = Some(o2);

    assert!(deduplicate_outputs(&mut a) > 0);
    assert_eq!(a.node(start).first_output, a.node(n).first_output);
    assert_eq!(a.node(start).first_output, Some(o1));
}

#[test]
fn collapses_chains_through_tails() {
    // Two chains ["a" -> "b"] built from distinct storage: the tails merge
    // first, which then makes the heads structurally equal.
    let mut a = Automata::new();
    let start = a.start();
    let n = a.add_node();
    let tail1 = a.add_output(b"b".to_vec(), None);
    let head1 = a.add_output(b"a".to_vec(), Some(tail1));
    let tail2 = a.add_output(b"b".to_vec(), None);
    let head2 = a.add_output(b"a".to_vec(), Some(tail2));
    a.node_mut(start).first_output = Some(head1);
    a.node_mut(n).first_output = Some(head2);

    deduplicate_outputs(&mut a);

    assert_eq!(a.node(start).first_output, a.node(n).first_output);
    let chain: Vec<Vec<u8>> = a
        .output_chain(a.node(start).first_output)
        .map(|(_, o)| o.content.clone())
        .collect();
    assert_eq!(chain, vec![b"a".to_vec(), b"b".to_vec()]);
}

#[test]
fn distinct_contents_stay_apart() {
    let mut a = Automata::new();
    let start = a.start();
    let n = a.add_node();
    let o1 = a.add_output(b"one".to_vec(), None);
    let o2 = a.add_output(b"two".to_vec(), None);
    a.node_mut(start).first_output = Some(o1);
    a.node_mut(n).first_output = Some(o2);

    assert_eq!(deduplicate_outputs(&mut a), 0);
    assert_ne!(a.node(start).first_output, a.node(n).first_output);
}

#[test]
fn idempotent() {
    let mut a = Automata::new();
    let start = a.start();
    let n = a.add_node();
    let o1 = a.add_output(b"x".to_vec(), None);
    let o2 = a.add_output(b"x".to_vec(), None);
    a.node_mut(start).first_output = Some(o1);
    a.node_mut(n).first_output = Some(o2);

    assert!(deduplicate_outputs(&mut a) > 0);
    assert_eq!(deduplicate_outputs(&mut a), 0);
}
