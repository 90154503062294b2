//! Image format: header, node records, output records, loading, dump.

mod aligned;
mod dump;
mod header;
mod image;
mod record;

#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod image_tests;

pub use aligned::Aligned64;
pub use dump::dump;
pub use header::{
    ENDIAN_BIG, ENDIAN_LITTLE, FLAG_NO_ADVANCE_NO_OUTPUT, HEADER_SIZE, Header, MAGIC, VERSION,
    native_endianness,
};
pub use image::{FormatError, Image, checksum};
pub use record::{
    HighRecord, KIND_HIGH, KIND_LOW, KIND_PATH, LowRecord, NodeRecord, OutputRecord, PathRecord,
    low, high, path,
};
