//! Layout and record emission.
//!
//! Nodes are placed breadth-first from the start node, each record aligned
//! to the configured boundary. Maximal single-entry chains become
//! path-compressed records; every other node is priced as a low or high
//! record and the cheaper encoding wins. Ids are patched once every record
//! has an offset; overflowing the id width aborts the attempt so the width
//! fixed point can move on.

use std::collections::{HashMap, HashSet, VecDeque};

use dictum_core::{Automata, NodeId, OutputId};
use indexmap::IndexMap;
use dictum_image::format::{
    FLAG_NO_ADVANCE_NO_OUTPUT, HEADER_SIZE, Header, Image, KIND_HIGH, KIND_LOW, KIND_PATH,
    checksum, high, low, path,
};

use super::assembler::{Assembler, Overflow};
use super::config::Config;
use super::cost::NodeOracle;
use super::error::{CompileError, CompileStats};

/// A compiled image with its emission statistics.
pub struct Compiled {
    pub image: Image,
    pub stats: CompileStats,
}

/// Compile an intermediate automata into an image.
///
/// Validates the automata, then runs the id-width fixed point: a pinned
/// width gets exactly one attempt; automatic width walks 1, 2, 4, 8 and
/// keeps the first attempt whose image stays addressable.
pub fn compile(automata: &Automata, config: &Config) -> Result<Compiled, CompileError> {
    if config.align_to == 0 {
        return Err(CompileError::ZeroAlignment);
    }
    if !config.high_node_weight.is_finite() || config.high_node_weight <= 0.0 {
        return Err(CompileError::BadWeight {
            weight: config.high_node_weight,
        });
    }
    dictum_core::validate(automata)?;

    for &width in config.id_width.candidates() {
        match emit_at_width(automata, config, width) {
            Ok((bytes, stats)) => {
                let image = Image::from_bytes(&bytes)
                    .expect("emitted images satisfy their own validation");
                return Ok(Compiled { image, stats });
            }
            Err(Overflow) => {
                if !config.id_width.is_auto() {
                    return Err(CompileError::IdWidthTooSmall { width });
                }
            }
        }
    }
    Err(CompileError::AddressSpaceExhausted)
}

fn emit_at_width(
    automata: &Automata,
    config: &Config,
    width: u8,
) -> Result<(Vec<u8>, CompileStats), Overflow> {
    let mut asm = Assembler::new(width);
    let mut stats = CompileStats::default();
    asm.push_bytes(&[0u8; HEADER_SIZE]);

    let parent_count = unique_parent_counts(automata);

    // Insertion order is layout order; the output pass walks it again.
    let mut node_offset: IndexMap<NodeId, u64> = IndexMap::new();
    let mut queued: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    queue.push_back(automata.start());
    queued.insert(automata.start());

    while let Some(id) = queue.pop_front() {
        stats.padding_bytes += asm.pad_to(config.align_to);
        node_offset.insert(id, asm.len());

        let (end, chain_len) = detect_chain(automata, id, &parent_count);
        if chain_len >= 2 {
            emit_path(&mut asm, &mut stats, automata, id, end, chain_len);
            enqueue(&mut queue, &mut queued, end);
        } else {
            let oracle = NodeOracle::new(automata, id, width);
            if oracle.prefer_high(config.high_node_weight) {
                emit_high(&mut asm, &mut stats, automata, id, &oracle);
            } else {
                emit_low(&mut asm, &mut stats, automata, id, &oracle);
            }
            for (_, t) in &oracle.entries {
                enqueue(&mut queue, &mut queued, t.target);
            }
        }
        if let Some(default) = automata.node(id).default_target {
            enqueue(&mut queue, &mut queued, default);
        }
        asm.check_capacity()?;
    }

    let (output_block, output_count, placed) = emit_outputs(&mut asm, automata, &node_offset)?;

    let metadata_block = emit_metadata(&mut asm, automata);

    // Fill in every reserved id now that offsets are final.
    let (node_refs, output_refs) = asm.take_refs();
    for (at, node) in node_refs {
        let offset = node_offset[&node];
        asm.write_id_at(at, offset)?;
    }
    for (at, output) in output_refs {
        let offset = placed[&output];
        asm.write_id_at(at, offset)?;
    }

    stats.ids_used = node_offset.len() + output_count as usize;

    let mut header = Header {
        id_width: width,
        alignment: config.align_to,
        flags: if automata.no_advance_no_output() {
            FLAG_NO_ADVANCE_NO_OUTPUT
        } else {
            0
        },
        total_size: asm.len(),
        node_count: node_offset.len() as u64,
        output_count,
        start_offset: node_offset[&automata.start()],
        output_block,
        metadata_block,
        ..Header::default()
    };

    let mut bytes = asm.into_bytes();
    header.checksum = checksum(&bytes[HEADER_SIZE..]);
    bytes[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    Ok((bytes, stats))
}

fn enqueue(queue: &mut VecDeque<NodeId>, queued: &mut HashSet<NodeId>, id: NodeId) {
    if queued.insert(id) {
        queue.push_back(id);
    }
}

/// Unique-parent counts over the reachable graph (defaults included), used
/// to keep path compression from swallowing join points.
fn unique_parent_counts(automata: &Automata) -> Vec<usize> {
    let mut counts = vec![0usize; automata.num_nodes()];
    for id in automata.breadth_first() {
        let node = automata.node(id);
        let mut targets: HashSet<NodeId> = node.edges.iter().map(|e| e.target).collect();
        if let Some(default) = node.default_target {
            targets.insert(default);
        }
        for target in targets {
            counts[target.index()] += 1;
        }
    }
    counts
}

/// Longest chain usable for path compression starting at `id`.
///
/// Links must be single single-byte advancing edges; interior nodes may not
/// emit outputs, change default behavior, or have other parents. Returns
/// the chain's final node and its length in bytes.
fn detect_chain(automata: &Automata, id: NodeId, parent_count: &[usize]) -> (NodeId, usize) {
    let unique_child = |n: NodeId| {
        let node = automata.node(n);
        if node.edges.len() == 1 && node.edges[0].matcher.len() == 1 {
            Some(node.edges[0].target)
        } else {
            None
        }
    };
    let same_defaults = |x: NodeId, y: NodeId| {
        let (nx, ny) = (automata.node(x), automata.node(y));
        nx.default_target == ny.default_target && nx.advance_on_default == ny.advance_on_default
    };

    let mut seen: HashSet<NodeId> = HashSet::from([id]);
    let mut end = id;
    let mut child = unique_child(id);
    let mut len = 0usize;

    while len < 255 {
        let Some(c) = child else { break };
        if seen.contains(&c)
            || automata.node(c).first_output.is_some()
            || !automata.node(end).edges[0].advance
            || unique_child(c).is_none()
            || !same_defaults(end, c)
            || parent_count[c.index()] != 1
        {
            break;
        }
        seen.insert(c);
        end = c;
        child = unique_child(c);
        len += 1;
    }
    (end, len)
}

fn emit_path(
    asm: &mut Assembler,
    stats: &mut CompileStats,
    automata: &Automata,
    head: NodeId,
    end: NodeId,
    chain_len: usize,
) {
    let before = asm.len();
    let node = automata.node(head);

    let mut header = KIND_PATH | path::ADVANCE_ON_FINAL;
    if node.first_output.is_some() {
        header |= path::HAS_OUTPUT;
    }
    if node.default_target.is_some() {
        header |= path::HAS_DEFAULT;
    }
    if node.advance_on_default {
        header |= path::ADVANCE_ON_DEFAULT;
    }
    asm.push_u8(header);
    asm.node_ref(end);
    if let Some(output) = node.first_output {
        asm.output_ref(output);
    }
    if let Some(default) = node.default_target {
        asm.node_ref(default);
    }
    asm.push_u8(chain_len as u8);

    let mut cur = head;
    while cur != end {
        let edge = &automata.node(cur).edges[0];
        let byte = edge
            .matcher
            .as_set()
            .min()
            .expect("chain links are single-byte edges");
        asm.push_u8(byte);
        cur = edge.target;
    }

    stats.pc_nodes += 1;
    stats.pc_node_bytes += (asm.len() - before) as usize;
}

fn emit_low(
    asm: &mut Assembler,
    stats: &mut CompileStats,
    automata: &Automata,
    id: NodeId,
    oracle: &NodeOracle,
) {
    let before = asm.len();
    let node = automata.node(id);
    let degree = oracle.degree();

    let mut header = KIND_LOW;
    if node.first_output.is_some() {
        header |= low::HAS_OUTPUT;
    }
    if oracle.has_nonadvancing {
        header |= low::HAS_NONADVANCING;
    }
    if node.default_target.is_some() {
        header |= low::HAS_DEFAULT;
    }
    if node.advance_on_default {
        header |= low::ADVANCE_ON_DEFAULT;
    }
    if degree > 0 {
        header |= low::HAS_EDGES;
    }
    asm.push_u8(header);

    if let Some(output) = node.first_output {
        asm.output_ref(output);
    }
    if degree > 0 {
        asm.push_u8(degree as u8);
    }
    if let Some(default) = node.default_target {
        asm.node_ref(default);
    }
    if oracle.has_nonadvancing && degree > 0 {
        let mut bits = vec![0u8; degree.div_ceil(8)];
        for (i, (_, t)) in oracle.entries.iter().enumerate() {
            if t.advance {
                bits[i / 8] |= 1 << (i % 8);
            }
        }
        asm.push_bytes(&bits);
    }
    for (b, t) in &oracle.entries {
        asm.push_u8(*b);
        asm.node_ref(t.target);
    }

    let emitted = (asm.len() - before) as usize;
    debug_assert_eq!(emitted, oracle.low_cost, "low cost model out of sync");
    stats.low_nodes += 1;
    stats.low_node_bytes += emitted;
}

fn emit_high(
    asm: &mut Assembler,
    stats: &mut CompileStats,
    automata: &Automata,
    id: NodeId,
    oracle: &NodeOracle,
) {
    let before = asm.len();
    let node = automata.node(id);
    let degree = oracle.degree();

    let mut header = KIND_HIGH;
    if node.first_output.is_some() {
        header |= high::HAS_OUTPUT;
    }
    if oracle.has_nonadvancing {
        header |= high::HAS_NONADVANCING;
    }
    if node.default_target.is_some() {
        header |= high::HAS_DEFAULT;
    }
    if node.advance_on_default {
        header |= high::ADVANCE_ON_DEFAULT;
    }
    if degree < 256 {
        header |= high::HAS_TARGET_BM;
    }
    if oracle.use_runs {
        header |= high::HAS_RUN_BM;
    }
    asm.push_u8(header);

    if let Some(output) = node.first_output {
        asm.output_ref(output);
    }
    if let Some(default) = node.default_target {
        asm.node_ref(default);
    }

    if oracle.has_nonadvancing {
        let mut bits = [0u8; 32];
        for (b, t) in &oracle.entries {
            if t.advance {
                bits[(b >> 3) as usize] |= 1 << (b & 7);
            }
        }
        asm.push_bytes(&bits);
    }
    if degree < 256 {
        let mut bits = [0u8; 32];
        for (b, _) in &oracle.entries {
            bits[(b >> 3) as usize] |= 1 << (b & 7);
        }
        asm.push_bytes(&bits);
    }
    if oracle.use_runs {
        let mut bits = [0u8; 32];
        let mut previous = None;
        for (b, t) in &oracle.entries {
            if previous.is_some() && previous != Some(t.target) {
                bits[(b >> 3) as usize] |= 1 << (b & 7);
            }
            previous = Some(t.target);
        }
        asm.push_bytes(&bits);

        let mut previous = None;
        for (_, t) in &oracle.entries {
            if previous != Some(t.target) {
                asm.node_ref(t.target);
            }
            previous = Some(t.target);
        }
    } else {
        for (_, t) in &oracle.entries {
            asm.node_ref(t.target);
        }
    }

    let emitted = (asm.len() - before) as usize;
    debug_assert_eq!(emitted, oracle.high_cost, "high cost model out of sync");
    stats.high_nodes += 1;
    stats.high_node_bytes += emitted;
}

/// Append output records for every chain reachable from the laid-out nodes.
///
/// Chains are written tail first so `next` ids are final immediately, and
/// records are hash-consed on (content, next offset) so structurally equal
/// chains share storage. Returns the block offset and record count.
fn emit_outputs(
    asm: &mut Assembler,
    automata: &Automata,
    node_offset: &IndexMap<NodeId, u64>,
) -> Result<(u64, u64, HashMap<OutputId, u64>), Overflow> {
    let mut placed: HashMap<OutputId, u64> = HashMap::new();
    let mut structural: HashMap<(Vec<u8>, u64), u64> = HashMap::new();
    let mut output_block = 0u64;
    let mut output_count = 0u64;

    for &id in node_offset.keys() {
        let Some(first) = automata.node(id).first_output else {
            continue;
        };

        // Collect the unplaced prefix of the chain, then emit it backwards.
        let mut pending = Vec::new();
        let mut cursor = Some(first);
        while let Some(oid) = cursor {
            if placed.contains_key(&oid) {
                break;
            }
            pending.push(oid);
            cursor = automata.output(oid).next;
        }

        while let Some(oid) = pending.pop() {
            let output = automata.output(oid);
            let next_offset = output.next.map(|n| placed[&n]).unwrap_or(0);
            let key = (output.content.clone(), next_offset);
            if let Some(&offset) = structural.get(&key) {
                placed.insert(oid, offset);
                continue;
            }

            let offset = asm.len();
            if output_block == 0 {
                output_block = offset;
            }
            asm.push_u32(output.content.len() as u32);
            asm.push_id(next_offset)?;
            asm.push_bytes(&output.content);
            asm.check_capacity()?;

            placed.insert(oid, offset);
            structural.insert(key, offset);
            output_count += 1;
        }
    }

    Ok((output_block, output_count, placed))
}

fn emit_metadata(asm: &mut Assembler, automata: &Automata) -> u64 {
    if automata.metadata().is_empty() {
        return 0;
    }
    let offset = asm.len();
    asm.push_u32(automata.metadata().len() as u32);
    for (key, value) in automata.metadata() {
        asm.push_u32(key.len() as u32);
        asm.push_bytes(key.as_bytes());
        asm.push_u32(value.len() as u32);
        asm.push_bytes(value);
    }
    offset
}
