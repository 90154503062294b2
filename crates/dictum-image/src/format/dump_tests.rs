use super::dump::dump;
use super::header::{FLAG_NO_ADVANCE_NO_OUTPUT, Header};
use super::image::{Image, checksum};
use super::record::{KIND_LOW, KIND_PATH, low, path};

fn minimal_image() -> Image {
    let body = vec![KIND_LOW | low::HAS_DEFAULT | low::ADVANCE_ON_DEFAULT, 64];
    let mut header = Header {
        id_width: 1,
        flags: FLAG_NO_ADVANCE_NO_OUTPUT,
        total_size: (64 + body.len()) as u64,
        node_count: 1,
        start_offset: 64,
        ..Header::default()
    };
    header.checksum = checksum(&body);
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend(body);
    Image::from_bytes(&bytes).unwrap()
}

/// start (path "he" -> terminal) plus one output on the terminal node.
fn path_image() -> Image {
    let mut body: Vec<u8> = Vec::new();
    // @64: path record, 5 bytes
    body.push(KIND_PATH | path::ADVANCE_ON_FINAL);
    body.push(69); // final target
    body.push(2);
    body.extend(b"he");
    // @69: terminal low node with an output, no transitions
    body.push(KIND_LOW | low::HAS_OUTPUT);
    body.push(71); // first output
    // @71: output record "hit", next = 0
    body.extend(3u32.to_ne_bytes());
    body.push(0);
    body.extend(b"hit");

    let mut header = Header {
        id_width: 1,
        total_size: (64 + body.len()) as u64,
        node_count: 2,
        output_count: 1,
        start_offset: 64,
        output_block: 71,
        ..Header::default()
    };
    header.checksum = checksum(&body);
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend(body);
    Image::from_bytes(&bytes).unwrap()
}

#[test]
fn minimal_dump_exact() {
    let text = dump(&minimal_image()).unwrap();
    let expected = [
        "version 1  id-width 1  alignment 1",
        "flags: no-advance-no-output",
        "nodes 1  outputs 0",
        "start @64",
        "node @64: low",
        "  default -> @64",
        "",
    ]
    .join("\n");
    assert_eq!(text, expected);
}

#[test]
fn minimal_dump_snapshot() {
    insta::assert_snapshot!(dump(&minimal_image()).unwrap(), @r"
    version 1  id-width 1  alignment 1
    flags: no-advance-no-output
    nodes 1  outputs 0
    start @64
    node @64: low
      default -> @64
    ");
}

#[test]
fn path_dump_lists_chain_and_outputs() {
    let text = dump(&path_image()).unwrap();
    assert!(text.contains("node @64: path \"he\" -> @69"));
    assert!(text.contains("node @69: low"));
    assert!(text.contains("  output @71"));
    assert!(text.contains("output @71: \"hit\""));
}
