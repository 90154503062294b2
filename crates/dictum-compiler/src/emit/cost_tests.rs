use dictum_core::{Automata, ByteSet, Edge};

use super::cost::NodeOracle;

#[test]
fn sparse_node_prices_low_cheaper() {
    let mut a = Automata::new();
    let start = a.start();
    let x = a.add_node();
    let y = a.add_node();
    a.node_mut(start).edges.push(Edge::byte(b'a', true, x));
    a.node_mut(start).edges.push(Edge::byte(b'b', true, y));

    let oracle = NodeOracle::new(&a, start, 1);
    assert_eq!(oracle.degree(), 2);
    // header + degree byte + 2 x (byte + id)
    assert_eq!(oracle.low_cost, 6);
    // header + target bitmap + 2 ids
    assert_eq!(oracle.high_cost, 35);
    assert!(!oracle.prefer_high(1.0));
    assert!(oracle.prefer_high(0.1));
}

#[test]
fn id_width_scales_costs() {
    let mut a = Automata::new();
    let start = a.start();
    let x = a.add_node();
    a.node_mut(start).edges.push(Edge::byte(b'a', true, x));
    a.node_mut(start).default_target = Some(start);
    a.node_mut(start).advance_on_default = true;

    let narrow = NodeOracle::new(&a, start, 1);
    let wide = NodeOracle::new(&a, start, 8);
    // Wider ids make both encodings dearer, the high one much more so.
    assert!(wide.low_cost > narrow.low_cost);
    assert!(wide.high_cost > narrow.high_cost);
    assert_eq!(narrow.low_cost, 1 + 1 + 1 + (1 + 1));
    assert_eq!(wide.low_cost, 1 + 1 + 8 + (1 + 8));
}

#[test]
fn default_equal_entries_are_not_stored() {
    let mut a = Automata::new();
    let start = a.start();
    let x = a.add_node();
    // 'a' goes where the default goes, with the same advance flag: only 'b'
    // needs an explicit entry.
    a.node_mut(start).edges.push(Edge::byte(b'a', true, x));
    a.node_mut(start).edges.push(Edge::byte(b'b', true, start));
    a.node_mut(start).default_target = Some(x);
    a.node_mut(start).advance_on_default = true;

    let oracle = NodeOracle::new(&a, start, 1);
    assert_eq!(oracle.degree(), 1);
    assert_eq!(oracle.entries[0].0, b'b');
}

#[test]
fn full_fanout_forces_high() {
    let mut a = Automata::new();
    let start = a.start();
    let t = a.add_node();
    a.node_mut(start)
        .edges
        .push(Edge::class(ByteSet::full(), true, t));

    let oracle = NodeOracle::new(&a, start, 1);
    assert_eq!(oracle.degree(), 256);
    // A low record cannot index 256 entries, whatever the weight says.
    assert!(oracle.prefer_high(1000.0));
    // One long run: target bitmap omitted, run bitmap plus a single entry.
    assert!(oracle.use_runs);
    assert_eq!(oracle.high_cost, 1 + 32 + 1);
}

#[test]
fn nonadvancing_entries_add_bitmap_cost() {
    let mut a = Automata::new();
    let start = a.start();
    let x = a.add_node();
    a.node_mut(start).edges.push(Edge::byte(b'a', false, x));

    let oracle = NodeOracle::new(&a, start, 1);
    assert!(oracle.has_nonadvancing);
    // header + degree byte + advance bits + entry
    assert_eq!(oracle.low_cost, 1 + 1 + 1 + (1 + 1));
    // header + advance bitmap + target bitmap + id
    assert_eq!(oracle.high_cost, 1 + 32 + 32 + 1);
}

#[test]
fn run_threshold_gates_run_compression() {
    let mut a = Automata::new();
    let start = a.start();
    let t = a.add_node();
    // 30 consecutive repeats stay under the threshold.
    a.node_mut(start)
        .edges
        .push(Edge::class(ByteSet::range(b'!', b'!' + 30), true, t));
    let oracle = NodeOracle::new(&a, start, 1);
    assert_eq!(oracle.num_consecutive, 30);
    assert!(!oracle.use_runs);

    // 40 repeats cross it.
    let mut b = Automata::new();
    let start = b.start();
    let t = b.add_node();
    b.node_mut(start)
        .edges
        .push(Edge::class(ByteSet::range(b'!', b'!' + 40), true, t));
    let oracle = NodeOracle::new(&b, start, 1);
    assert_eq!(oracle.num_consecutive, 40);
    assert!(oracle.use_runs);
}
