//! Compiled automata image format for dictum.
//!
//! An image is one contiguous byte region: a fixed 64-byte header, node
//! records, output records, and a metadata block. Every internal reference
//! ("id") is a byte offset from the start of the image, stored at the width
//! the header declares. The file representation is the execution
//! representation — loading is a read or a map plus validation, never a
//! transformation.

pub mod format;

pub use format::{
    ENDIAN_BIG, ENDIAN_LITTLE, FLAG_NO_ADVANCE_NO_OUTPUT, FormatError, HEADER_SIZE, Header,
    HighRecord, Image, LowRecord, MAGIC, NodeRecord, OutputRecord, PathRecord, VERSION, checksum,
    dump,
};
