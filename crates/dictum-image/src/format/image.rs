//! Image loading and validation.
//!
//! An image may be owned (bytes copied into aligned storage) or memory
//! mapped. Either way the content is validated once up front; after that the
//! engine reads records in place and never mutates.

use std::path::Path;

use super::aligned::Aligned64;
use super::header::{self, HEADER_SIZE, Header, MAGIC, VERSION};
use super::record::{NodeRecord, OutputRecord, read_id};

/// Compute the checksum stored in an image header: crc32 of everything after
/// the fixed header.
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// A malformed or unloadable image.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("not an automata image (bad magic)")]
    BadMagic,

    #[error("unsupported image version {found} (expected {VERSION})")]
    BadVersion { found: u16 },

    #[error("image byte order does not match this host")]
    EndianMismatch,

    #[error("invalid id width {found} (expected 1, 2, 4, or 8)")]
    BadIdWidth { found: u8 },

    #[error("invalid alignment {found}")]
    BadAlignment { found: u16 },

    #[error("image truncated: {have} bytes, header declares {declared}")]
    SizeMismatch { declared: u64, have: u64 },

    #[error("checksum mismatch: header {stored:#010x}, content {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("{what} offset {offset} lies outside the image")]
    BadBlockOffset { what: &'static str, offset: u64 },

    #[error("read past end of image at offset {offset}")]
    OutOfBounds { offset: u64 },

    #[error("unknown node record kind {kind} at offset {offset}")]
    BadNodeKind { offset: u64, kind: u8 },

    #[error("malformed metadata block")]
    BadMetadata,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

enum Storage {
    Owned(Aligned64),
    Mapped(memmap2::Mmap),
}

impl Storage {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Owned(aligned) => aligned.as_slice(),
            Self::Mapped(map) => map,
        }
    }
}

/// A validated, immutable compiled automata image.
///
/// `Image` is `Sync`: any number of scanners may execute over one image
/// concurrently, since all run state lives in the scanner.
pub struct Image {
    storage: Storage,
    header: Header,
}

impl Image {
    /// Copy `bytes` into aligned storage and validate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        Self::load(Storage::Owned(Aligned64::from_bytes(bytes)))
    }

    /// Memory-map an image file and validate.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the map is private and read-only; the engine never expects
        // the file to change underneath it (external truncation is the same
        // contract as for any mapped artifact).
        let map = unsafe { memmap2::Mmap::map(&file)? };
        Self::load(Storage::Mapped(map))
    }

    fn load(storage: Storage) -> Result<Self, FormatError> {
        let bytes = storage.bytes();
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::SizeMismatch {
                declared: HEADER_SIZE as u64,
                have: bytes.len() as u64,
            });
        }

        // Magic and byte order come first: every later field depends on them.
        if bytes[..4] != MAGIC {
            return Err(FormatError::BadMagic);
        }
        if bytes[7] != header::native_endianness() {
            return Err(FormatError::EndianMismatch);
        }

        let header = Header::from_bytes(bytes);
        if header.version != VERSION {
            return Err(FormatError::BadVersion {
                found: header.version,
            });
        }
        if !matches!(header.id_width, 1 | 2 | 4 | 8) {
            return Err(FormatError::BadIdWidth {
                found: header.id_width,
            });
        }
        if header.alignment == 0 {
            return Err(FormatError::BadAlignment {
                found: header.alignment,
            });
        }
        if header.total_size != bytes.len() as u64 {
            return Err(FormatError::SizeMismatch {
                declared: header.total_size,
                have: bytes.len() as u64,
            });
        }

        let in_body = |offset: u64| offset >= HEADER_SIZE as u64 && offset < header.total_size;
        if !in_body(header.start_offset) {
            return Err(FormatError::BadBlockOffset {
                what: "start node",
                offset: header.start_offset,
            });
        }
        if header.output_block != 0 && !in_body(header.output_block) {
            return Err(FormatError::BadBlockOffset {
                what: "output block",
                offset: header.output_block,
            });
        }
        if header.metadata_block != 0 && !in_body(header.metadata_block) {
            return Err(FormatError::BadBlockOffset {
                what: "metadata block",
                offset: header.metadata_block,
            });
        }

        let computed = checksum(&bytes[HEADER_SIZE..]);
        if computed != header.checksum {
            return Err(FormatError::ChecksumMismatch {
                stored: header.checksum,
                computed,
            });
        }

        Ok(Self { storage, header })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.storage.bytes()
    }

    pub fn id_width(&self) -> u8 {
        self.header.id_width
    }

    pub fn start_offset(&self) -> u64 {
        self.header.start_offset
    }

    pub fn no_advance_no_output(&self) -> bool {
        self.header.no_advance_no_output()
    }

    /// Decode the node record at `offset`.
    pub fn node_at(&self, offset: u64) -> Result<NodeRecord<'_>, FormatError> {
        NodeRecord::decode(self.as_bytes(), offset, self.header.id_width)
    }

    /// Decode the output record at `offset`; also returns the end offset.
    pub fn output_at(&self, offset: u64) -> Result<(OutputRecord<'_>, u64), FormatError> {
        OutputRecord::decode(self.as_bytes(), offset, self.header.id_width)
    }

    /// Read one id at `offset`.
    pub fn read_id(&self, offset: u64) -> Result<u64, FormatError> {
        read_id(self.as_bytes(), offset as usize, self.header.id_width)
    }

    /// Decode the metadata block.
    pub fn metadata(&self) -> Result<Vec<(String, Vec<u8>)>, FormatError> {
        if self.header.metadata_block == 0 {
            return Ok(Vec::new());
        }
        let bytes = self.as_bytes();
        let mut pos = self.header.metadata_block as usize;

        let read_u32 = |pos: &mut usize| -> Result<u32, FormatError> {
            let field = bytes
                .get(*pos..*pos + 4)
                .ok_or(FormatError::BadMetadata)?;
            *pos += 4;
            Ok(u32::from_ne_bytes([field[0], field[1], field[2], field[3]]))
        };
        let read_bytes = |pos: &mut usize, len: usize| -> Result<&[u8], FormatError> {
            let slice = bytes
                .get(*pos..pos.checked_add(len).ok_or(FormatError::BadMetadata)?)
                .ok_or(FormatError::BadMetadata)?;
            *pos += len;
            Ok(slice)
        };

        let count = read_u32(&mut pos)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key_len = read_u32(&mut pos)? as usize;
            let key = std::str::from_utf8(read_bytes(&mut pos, key_len)?)
                .map_err(|_| FormatError::BadMetadata)?
                .to_string();
            let value_len = read_u32(&mut pos)? as usize;
            let value = read_bytes(&mut pos, value_len)?.to_vec();
            entries.push((key, value));
        }
        Ok(entries)
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("total_size", &self.header.total_size)
            .field("id_width", &self.header.id_width)
            .field("node_count", &self.header.node_count)
            .finish()
    }
}
