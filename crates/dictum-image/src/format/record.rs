//! Node and output record encodings.
//!
//! Every node record starts with one header byte: the low two bits select
//! the record kind, the remaining bits are kind-specific flags. Optional
//! fields are present exactly when their flag is set, in the documented
//! order. Ids are byte offsets into the image at the header-declared width;
//! id 0 is the null reference (offset 0 is the image header, never a
//! record).
//!
//! - **Low** records hold a flat `(byte, target)` list scanned linearly.
//!   `header | first_output? | out_degree? | default? | advance bits? | edges`
//! - **High** records dispatch through 256-bit bitmaps and a target table
//!   indexed by rank, with runs of identical targets collapsed when a
//!   run-index bitmap is present.
//!   `header | first_output? | default? | advance bm? | target bm? | run bm? | targets`
//! - **Path** records hold a literal byte chain and a final target.
//!   `header | final_target | first_output? | default? | len | bytes`
//!
//! Output records are `len: u32 | next: id | content bytes`; `next` chains
//! records and 0 terminates.

use super::image::FormatError;

pub const KIND_MASK: u8 = 0b0000_0011;
pub const KIND_LOW: u8 = 0;
pub const KIND_HIGH: u8 = 1;
pub const KIND_PATH: u8 = 2;

/// Flag bits for low records.
pub mod low {
    pub const HAS_OUTPUT: u8 = 1 << 2;
    pub const HAS_NONADVANCING: u8 = 1 << 3;
    pub const HAS_DEFAULT: u8 = 1 << 4;
    pub const ADVANCE_ON_DEFAULT: u8 = 1 << 5;
    pub const HAS_EDGES: u8 = 1 << 6;
}

/// Flag bits for high records.
pub mod high {
    pub const HAS_OUTPUT: u8 = 1 << 2;
    pub const HAS_NONADVANCING: u8 = 1 << 3;
    pub const HAS_DEFAULT: u8 = 1 << 4;
    pub const ADVANCE_ON_DEFAULT: u8 = 1 << 5;
    pub const HAS_TARGET_BM: u8 = 1 << 6;
    pub const HAS_RUN_BM: u8 = 1 << 7;
}

/// Flag bits for path records.
pub mod path {
    pub const HAS_OUTPUT: u8 = 1 << 2;
    pub const HAS_DEFAULT: u8 = 1 << 3;
    pub const ADVANCE_ON_DEFAULT: u8 = 1 << 4;
    pub const ADVANCE_ON_FINAL: u8 = 1 << 5;
}

/// Read an id of `width` bytes at `pos`.
pub(crate) fn read_id(bytes: &[u8], pos: usize, width: u8) -> Result<u64, FormatError> {
    let end = pos
        .checked_add(width as usize)
        .ok_or(FormatError::OutOfBounds { offset: pos as u64 })?;
    let field = bytes
        .get(pos..end)
        .ok_or(FormatError::OutOfBounds { offset: pos as u64 })?;
    let mut raw = [0u8; 8];
    if cfg!(target_endian = "big") {
        raw[8 - field.len()..].copy_from_slice(field);
    } else {
        raw[..field.len()].copy_from_slice(field);
    }
    Ok(u64::from_ne_bytes(raw))
}

/// Test bit `b` of a 32-byte bitmap.
fn bit(bm: &[u8], b: u8) -> bool {
    bm[(b >> 3) as usize] & (1 << (b & 7)) != 0
}

/// Count set bits at positions `0..=b`.
fn rank_inclusive(bm: &[u8], b: u8) -> usize {
    let full = (b >> 3) as usize;
    let mut count = 0usize;
    for byte in &bm[..full] {
        count += byte.count_ones() as usize;
    }
    let partial_mask = if b & 7 == 7 {
        0xff
    } else {
        (1u16 << ((b & 7) + 1)) as u8 - 1
    };
    count + (bm[full] & partial_mask).count_ones() as usize
}

/// Bounds-checked sequential reader.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn fail(&self) -> FormatError {
        FormatError::OutOfBounds {
            offset: self.pos as u64,
        }
    }

    fn u8(&mut self) -> Result<u8, FormatError> {
        let b = *self.bytes.get(self.pos).ok_or_else(|| self.fail())?;
        self.pos += 1;
        Ok(b)
    }

    fn u32(&mut self) -> Result<u32, FormatError> {
        let field = self
            .bytes
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.fail())?;
        self.pos += 4;
        Ok(u32::from_ne_bytes([field[0], field[1], field[2], field[3]]))
    }

    fn id(&mut self, width: u8) -> Result<u64, FormatError> {
        let id = read_id(self.bytes, self.pos, width)?;
        self.pos += width as usize;
        Ok(id)
    }

    fn id_if(&mut self, present: bool, width: u8) -> Result<u64, FormatError> {
        if present { self.id(width) } else { Ok(0) }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos.checked_add(n).ok_or_else(|| self.fail())?)
            .ok_or_else(|| self.fail())?;
        self.pos += n;
        Ok(slice)
    }
}

/// A decoded node record of any kind.
#[derive(Debug)]
pub enum NodeRecord<'a> {
    Low(LowRecord<'a>),
    High(HighRecord<'a>),
    Path(PathRecord<'a>),
}

impl<'a> NodeRecord<'a> {
    /// Decode the record starting at `offset`.
    pub fn decode(bytes: &'a [u8], offset: u64, id_width: u8) -> Result<Self, FormatError> {
        let pos = offset as usize;
        let mut cursor = Cursor::new(bytes, pos);
        let header = cursor.u8()?;
        match header & KIND_MASK {
            KIND_LOW => Ok(Self::Low(LowRecord::decode(cursor, header, id_width)?)),
            KIND_HIGH => Ok(Self::High(HighRecord::decode(cursor, header, id_width)?)),
            KIND_PATH => Ok(Self::Path(PathRecord::decode(cursor, header, id_width)?)),
            kind => Err(FormatError::BadNodeKind { offset, kind }),
        }
    }

    /// Head of the node's output chain (0 if none).
    pub fn first_output(&self) -> u64 {
        match self {
            Self::Low(r) => r.first_output,
            Self::High(r) => r.first_output,
            Self::Path(r) => r.first_output,
        }
    }

    /// Fallback target (0 if none) and whether taking it consumes input.
    pub fn default_transition(&self) -> (u64, bool) {
        match self {
            Self::Low(r) => (r.default_target, r.advance_on_default),
            Self::High(r) => (r.default_target, r.advance_on_default),
            Self::Path(r) => (r.default_target, r.advance_on_default),
        }
    }
}

/// Low-degree node: linear scan over a `(byte, target)` list.
#[derive(Debug)]
pub struct LowRecord<'a> {
    id_width: u8,
    pub first_output: u64,
    pub out_degree: u8,
    pub default_target: u64,
    pub advance_on_default: bool,
    has_nonadvancing: bool,
    advance_bits: &'a [u8],
    edges: &'a [u8],
}

impl<'a> LowRecord<'a> {
    fn decode(mut cursor: Cursor<'a>, header: u8, id_width: u8) -> Result<Self, FormatError> {
        let has_output = header & low::HAS_OUTPUT != 0;
        let has_nonadvancing = header & low::HAS_NONADVANCING != 0;
        let has_default = header & low::HAS_DEFAULT != 0;
        let has_edges = header & low::HAS_EDGES != 0;

        let first_output = cursor.id_if(has_output, id_width)?;
        let out_degree = if has_edges { cursor.u8()? } else { 0 };
        let default_target = cursor.id_if(has_default, id_width)?;
        let advance_bits = if has_nonadvancing && has_edges {
            cursor.take((out_degree as usize).div_ceil(8))?
        } else {
            &[]
        };
        let edges = cursor.take(out_degree as usize * (1 + id_width as usize))?;

        Ok(Self {
            id_width,
            first_output,
            out_degree,
            default_target,
            advance_on_default: header & low::ADVANCE_ON_DEFAULT != 0,
            has_nonadvancing,
            advance_bits,
            edges,
        })
    }

    /// Explicit transition for `b`, if one is stored.
    pub fn lookup(&self, b: u8) -> Option<(u64, bool)> {
        let stride = 1 + self.id_width as usize;
        for i in 0..self.out_degree as usize {
            if self.edges[i * stride] == b {
                let target = read_id(self.edges, i * stride + 1, self.id_width)
                    .expect("edge list length checked at decode");
                let advance = !self.has_nonadvancing
                    || self.advance_bits[i / 8] & (1 << (i % 8)) != 0;
                return Some((target, advance));
            }
        }
        None
    }

    /// Iterate stored `(byte, target, advance)` entries.
    pub fn entries(&self) -> impl Iterator<Item = (u8, u64, bool)> + '_ {
        let stride = 1 + self.id_width as usize;
        (0..self.out_degree as usize).map(move |i| {
            let b = self.edges[i * stride];
            let target = read_id(self.edges, i * stride + 1, self.id_width)
                .expect("edge list length checked at decode");
            let advance =
                !self.has_nonadvancing || self.advance_bits[i / 8] & (1 << (i % 8)) != 0;
            (b, target, advance)
        })
    }
}

/// High-degree node: bitmap dispatch into a rank-indexed target table.
#[derive(Debug)]
pub struct HighRecord<'a> {
    id_width: u8,
    pub first_output: u64,
    pub default_target: u64,
    pub advance_on_default: bool,
    advance_bm: Option<&'a [u8]>,
    target_bm: Option<&'a [u8]>,
    run_bm: Option<&'a [u8]>,
    targets: &'a [u8],
}

impl<'a> HighRecord<'a> {
    fn decode(mut cursor: Cursor<'a>, header: u8, id_width: u8) -> Result<Self, FormatError> {
        let has_output = header & high::HAS_OUTPUT != 0;
        let has_nonadvancing = header & high::HAS_NONADVANCING != 0;
        let has_default = header & high::HAS_DEFAULT != 0;
        let has_target_bm = header & high::HAS_TARGET_BM != 0;
        let has_run_bm = header & high::HAS_RUN_BM != 0;

        let first_output = cursor.id_if(has_output, id_width)?;
        let default_target = cursor.id_if(has_default, id_width)?;
        let advance_bm = if has_nonadvancing {
            Some(cursor.take(32)?)
        } else {
            None
        };
        let target_bm = if has_target_bm {
            Some(cursor.take(32)?)
        } else {
            None
        };
        let run_bm = if has_run_bm {
            Some(cursor.take(32)?)
        } else {
            None
        };

        let degree = match target_bm {
            Some(bm) => bm.iter().map(|b| b.count_ones() as usize).sum(),
            None => 256,
        };
        let entries = match run_bm {
            Some(bm) => {
                let changes: usize = bm.iter().map(|b| b.count_ones() as usize).sum();
                if degree == 0 { 0 } else { changes + 1 }
            }
            None => degree,
        };
        let targets = cursor.take(entries * id_width as usize)?;

        Ok(Self {
            id_width,
            first_output,
            default_target,
            advance_on_default: header & high::ADVANCE_ON_DEFAULT != 0,
            advance_bm,
            target_bm,
            run_bm,
            targets,
        })
    }

    /// Explicit transition for `b`, if one is stored.
    pub fn lookup(&self, b: u8) -> Option<(u64, bool)> {
        if let Some(bm) = self.target_bm
            && !bit(bm, b)
        {
            return None;
        }
        let index = match (self.run_bm, self.target_bm) {
            (Some(run), _) => rank_inclusive(run, b),
            (None, Some(bm)) => rank_inclusive(bm, b) - 1,
            (None, None) => b as usize,
        };
        let target = read_id(self.targets, index * self.id_width as usize, self.id_width)
            .expect("target table length checked at decode");
        let advance = self.advance_bm.map(|bm| bit(bm, b)).unwrap_or(true);
        Some((target, advance))
    }
}

/// Path-compressed node: a literal chain of bytes, then a final target.
#[derive(Debug)]
pub struct PathRecord<'a> {
    pub final_target: u64,
    pub first_output: u64,
    pub default_target: u64,
    pub advance_on_default: bool,
    pub advance_on_final: bool,
    pub chain: &'a [u8],
}

impl<'a> PathRecord<'a> {
    fn decode(mut cursor: Cursor<'a>, header: u8, id_width: u8) -> Result<Self, FormatError> {
        let has_output = header & path::HAS_OUTPUT != 0;
        let has_default = header & path::HAS_DEFAULT != 0;

        let final_target = cursor.id(id_width)?;
        let first_output = cursor.id_if(has_output, id_width)?;
        let default_target = cursor.id_if(has_default, id_width)?;
        let len = cursor.u8()?;
        let chain = cursor.take(len as usize)?;

        Ok(Self {
            final_target,
            first_output,
            default_target,
            advance_on_default: header & path::ADVANCE_ON_DEFAULT != 0,
            advance_on_final: header & path::ADVANCE_ON_FINAL != 0,
            chain,
        })
    }
}

/// A decoded output record.
#[derive(Debug, PartialEq, Eq)]
pub struct OutputRecord<'a> {
    pub next: u64,
    pub content: &'a [u8],
}

impl<'a> OutputRecord<'a> {
    /// Decode the output record starting at `offset`. Returns the record and
    /// the offset one past its end.
    pub fn decode(bytes: &'a [u8], offset: u64, id_width: u8) -> Result<(Self, u64), FormatError> {
        let mut cursor = Cursor::new(bytes, offset as usize);
        let len = cursor.u32()?;
        let next = cursor.id(id_width)?;
        let content = cursor.take(len as usize)?;
        Ok((Self { next, content }, cursor.pos as u64))
    }
}
