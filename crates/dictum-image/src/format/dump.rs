//! Human-readable image listing.
//!
//! Walks the node graph breadth-first from the start record and prints one
//! block per record, then the output and metadata sections. The format is
//! stable; snapshot tests depend on it.

use super::image::{FormatError, Image};
use super::record::NodeRecord;

/// Render an image as text.
pub fn dump(image: &Image) -> Result<String, FormatError> {
    let header = image.header();
    let mut out = String::new();

    out.push_str(&format!(
        "version {}  id-width {}  alignment {}\n",
        header.version, header.id_width, header.alignment
    ));
    let flags = if header.no_advance_no_output() {
        "no-advance-no-output"
    } else {
        "-"
    };
    out.push_str(&format!("flags: {flags}\n"));
    out.push_str(&format!(
        "nodes {}  outputs {}\n",
        header.node_count, header.output_count
    ));
    out.push_str(&format!("start @{}\n", header.start_offset));

    dump_nodes(image, &mut out)?;
    dump_outputs(image, &mut out)?;
    dump_metadata(image, &mut out)?;

    Ok(out)
}

fn dump_nodes(image: &Image, out: &mut String) -> Result<(), FormatError> {
    let mut queue = std::collections::VecDeque::new();
    let mut seen = std::collections::BTreeSet::new();

    queue.push_back(image.start_offset());
    seen.insert(image.start_offset());

    let mut enqueue = |queue: &mut std::collections::VecDeque<u64>,
                       seen: &mut std::collections::BTreeSet<u64>,
                       offset: u64| {
        if offset != 0 && seen.insert(offset) {
            queue.push_back(offset);
        }
    };

    while let Some(offset) = queue.pop_front() {
        let record = image.node_at(offset)?;
        match &record {
            NodeRecord::Low(low) => {
                out.push_str(&format!("node @{offset}: low\n"));
                push_output_line(out, low.first_output);
                let table = entry_table(low.entries());
                push_entry_lines(out, &table);
                for (_, target, _) in low.entries() {
                    enqueue(&mut queue, &mut seen, target);
                }
            }
            NodeRecord::High(high) => {
                out.push_str(&format!("node @{offset}: high\n"));
                push_output_line(out, high.first_output);
                let entries = (0u16..256).filter_map(|b| {
                    let b = b as u8;
                    high.lookup(b).map(|(target, advance)| (b, target, advance))
                });
                let table = entry_table(entries);
                push_entry_lines(out, &table);
                for (_, _, target, _) in &table {
                    enqueue(&mut queue, &mut seen, *target);
                }
            }
            NodeRecord::Path(path) => {
                let suffix = if path.advance_on_final {
                    ""
                } else {
                    " (no advance)"
                };
                out.push_str(&format!(
                    "node @{offset}: path {} -> @{}{suffix}\n",
                    render_bytes(path.chain),
                    path.final_target
                ));
                push_output_line(out, path.first_output);
                enqueue(&mut queue, &mut seen, path.final_target);
            }
        }

        let (default_target, advance_on_default) = record.default_transition();
        if default_target != 0 {
            let suffix = if advance_on_default {
                ""
            } else {
                " (no advance)"
            };
            out.push_str(&format!("  default -> @{default_target}{suffix}\n"));
            enqueue(&mut queue, &mut seen, default_target);
        }
    }
    Ok(())
}

/// Collapse per-byte entries into (lo, hi, target, advance) runs.
fn entry_table(entries: impl Iterator<Item = (u8, u64, bool)>) -> Vec<(u8, u8, u64, bool)> {
    let mut runs: Vec<(u8, u8, u64, bool)> = Vec::new();
    for (b, target, advance) in entries {
        match runs.last_mut() {
            Some((_, hi, t, a)) if *t == target && *a == advance && *hi as u16 + 1 == b as u16 => {
                *hi = b;
            }
            _ => runs.push((b, b, target, advance)),
        }
    }
    runs
}

fn push_entry_lines(out: &mut String, runs: &[(u8, u8, u64, bool)]) {
    for &(lo, hi, target, advance) in runs {
        let range = if lo == hi {
            render_byte(lo)
        } else {
            format!("{}-{}", render_byte(lo), render_byte(hi))
        };
        let suffix = if advance { "" } else { " (no advance)" };
        out.push_str(&format!("  {range} -> @{target}{suffix}\n"));
    }
}

fn push_output_line(out: &mut String, first_output: u64) {
    if first_output != 0 {
        out.push_str(&format!("  output @{first_output}\n"));
    }
}

fn dump_outputs(image: &Image, out: &mut String) -> Result<(), FormatError> {
    let header = image.header();
    if header.output_block == 0 {
        return Ok(());
    }
    let mut offset = header.output_block;
    for _ in 0..header.output_count {
        let (record, end) = image.output_at(offset)?;
        let next = if record.next != 0 {
            format!(" -> @{}", record.next)
        } else {
            String::new()
        };
        out.push_str(&format!(
            "output @{offset}: {}{next}\n",
            render_bytes(record.content)
        ));
        offset = end;
    }
    Ok(())
}

fn dump_metadata(image: &Image, out: &mut String) -> Result<(), FormatError> {
    for (key, value) in image.metadata()? {
        out.push_str(&format!(
            "meta {} = {}\n",
            render_bytes(key.as_bytes()),
            render_bytes(&value)
        ));
    }
    Ok(())
}

fn render_byte(b: u8) -> String {
    if b.is_ascii_graphic() || b == b' ' {
        format!("'{}'", b as char)
    } else {
        format!("{b:#04x}")
    }
}

fn render_bytes(bytes: &[u8]) -> String {
    let mut s = String::from("\"");
    for &b in bytes {
        match b {
            b'"' => s.push_str("\\\""),
            b'\\' => s.push_str("\\\\"),
            0x20..=0x7e => s.push(b as char),
            _ => s.push_str(&format!("\\x{b:02x}")),
        }
    }
    s.push('"');
    s
}
