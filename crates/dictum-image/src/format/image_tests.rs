use super::header::{FLAG_NO_ADVANCE_NO_OUTPUT, Header};
use super::image::{FormatError, Image, checksum};
use super::record::{KIND_LOW, NodeRecord, low};

/// Hand-assembled single-node image: the start node defaults to itself and
/// advances, id width 1.
fn minimal_image_bytes() -> Vec<u8> {
    let body = vec![KIND_LOW | low::HAS_DEFAULT | low::ADVANCE_ON_DEFAULT, 64];

    let mut header = Header {
        id_width: 1,
        flags: FLAG_NO_ADVANCE_NO_OUTPUT,
        total_size: (64 + body.len()) as u64,
        node_count: 1,
        output_count: 0,
        start_offset: 64,
        ..Header::default()
    };
    header.checksum = checksum(&body);

    let mut bytes = header.to_bytes().to_vec();
    bytes.extend(body);
    bytes
}

/// Minimal image followed by a metadata block with one entry.
fn image_with_metadata() -> Vec<u8> {
    let mut body = vec![KIND_LOW | low::HAS_DEFAULT | low::ADVANCE_ON_DEFAULT, 64];
    let metadata_block = 64 + body.len() as u64;
    body.extend(1u32.to_ne_bytes()); // one entry
    body.extend(1u32.to_ne_bytes());
    body.push(b'k');
    body.extend(2u32.to_ne_bytes());
    body.extend([1u8, 2]);

    let mut header = Header {
        id_width: 1,
        total_size: (64 + body.len()) as u64,
        node_count: 1,
        start_offset: 64,
        metadata_block,
        ..Header::default()
    };
    header.checksum = checksum(&body);

    let mut bytes = header.to_bytes().to_vec();
    bytes.extend(body);
    bytes
}

#[test]
fn loads_and_reads() {
    let image = Image::from_bytes(&minimal_image_bytes()).unwrap();
    assert_eq!(image.id_width(), 1);
    assert_eq!(image.start_offset(), 64);
    assert!(image.no_advance_no_output());
    assert_eq!(image.header().node_count, 1);

    let record = image.node_at(image.start_offset()).unwrap();
    assert!(matches!(record, NodeRecord::Low(_)));
    assert_eq!(record.default_transition(), (64, true));
    assert_eq!(record.first_output(), 0);
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = minimal_image_bytes();
    bytes[0] = b'X';
    assert!(matches!(
        Image::from_bytes(&bytes),
        Err(FormatError::BadMagic)
    ));
}

#[test]
fn rejects_bad_version() {
    let mut bytes = minimal_image_bytes();
    bytes[4..6].copy_from_slice(&9u16.to_ne_bytes());
    assert!(matches!(
        Image::from_bytes(&bytes),
        Err(FormatError::BadVersion { found: 9 })
    ));
}

#[test]
fn rejects_foreign_byte_order() {
    let mut bytes = minimal_image_bytes();
    bytes[7] ^= 0b11; // flips little <-> big
    assert!(matches!(
        Image::from_bytes(&bytes),
        Err(FormatError::EndianMismatch)
    ));
}

#[test]
fn rejects_bad_id_width() {
    let mut bytes = minimal_image_bytes();
    bytes[6] = 3;
    assert!(matches!(
        Image::from_bytes(&bytes),
        Err(FormatError::BadIdWidth { found: 3 })
    ));
}

#[test]
fn rejects_truncated_image() {
    let bytes = minimal_image_bytes();
    assert!(matches!(
        Image::from_bytes(&bytes[..bytes.len() - 1]),
        Err(FormatError::SizeMismatch { .. })
    ));
    assert!(matches!(
        Image::from_bytes(&bytes[..10]),
        Err(FormatError::SizeMismatch { .. })
    ));
}

#[test]
fn rejects_corrupted_body() {
    let mut bytes = minimal_image_bytes();
    let end = bytes.len() - 1;
    bytes[end] ^= 0xff;
    assert!(matches!(
        Image::from_bytes(&bytes),
        Err(FormatError::ChecksumMismatch { .. })
    ));
}

#[test]
fn rejects_out_of_range_start() {
    let mut bytes = minimal_image_bytes();
    bytes[40..48].copy_from_slice(&0u64.to_ne_bytes());
    assert!(matches!(
        Image::from_bytes(&bytes),
        Err(FormatError::BadBlockOffset { what: "start node", .. })
    ));
}

#[test]
fn metadata_decodes() {
    let image = Image::from_bytes(&image_with_metadata()).unwrap();
    let entries = image.metadata().unwrap();
    assert_eq!(entries, vec![("k".to_string(), vec![1, 2])]);
}

#[test]
fn no_metadata_block_is_empty() {
    let image = Image::from_bytes(&minimal_image_bytes()).unwrap();
    assert_eq!(image.metadata().unwrap(), Vec::new());
}

#[test]
fn open_maps_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minimal.dctm");
    std::fs::write(&path, minimal_image_bytes()).unwrap();

    let image = Image::open(&path).unwrap();
    assert_eq!(image.start_offset(), 64);
    assert!(image.node_at(64).is_ok());
}
