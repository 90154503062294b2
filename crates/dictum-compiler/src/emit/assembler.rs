//! Byte-buffer assembler with deferred id patching.
//!
//! Node and output offsets are unknown while records are being appended, so
//! id fields are reserved as zeroed slots and patched once layout finishes.
//! Every append and patch checks the id-width address ceiling; blowing it is
//! the signal to retry at the next width.

use dictum_core::{NodeId, OutputId};

/// The image outgrew what the current id width can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Overflow;

pub(crate) struct Assembler {
    buf: Vec<u8>,
    id_width: u8,
    max_index: u64,
    node_refs: Vec<(usize, NodeId)>,
    output_refs: Vec<(usize, OutputId)>,
}

impl Assembler {
    pub fn new(id_width: u8) -> Self {
        let max_index = if id_width == 8 {
            u64::MAX
        } else {
            (1u64 << (8 * id_width as u32)) - 1
        };
        Self {
            buf: Vec::new(),
            id_width,
            max_index,
            node_refs: Vec::new(),
            output_refs: Vec::new(),
        }
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn push_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn push_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pad with 0xAA up to the next multiple of `align`. Returns the number
    /// of padding bytes added.
    pub fn pad_to(&mut self, align: u16) -> usize {
        let align = align as usize;
        let over = self.buf.len() % align;
        let padding = if over == 0 { 0 } else { align - over };
        self.buf.resize(self.buf.len() + padding, 0xaa);
        padding
    }

    /// Reserve an id-sized slot, returning its index for later patching.
    pub fn reserve_id(&mut self) -> usize {
        let at = self.buf.len();
        self.buf.resize(at + self.id_width as usize, 0);
        at
    }

    /// Reserve an id slot to be patched with `node`'s offset.
    pub fn node_ref(&mut self, node: NodeId) {
        let at = self.reserve_id();
        self.node_refs.push((at, node));
    }

    /// Reserve an id slot to be patched with `output`'s offset.
    pub fn output_ref(&mut self, output: OutputId) {
        let at = self.reserve_id();
        self.output_refs.push((at, output));
    }

    /// Write an id value into a previously reserved slot.
    pub fn write_id_at(&mut self, at: usize, value: u64) -> Result<(), Overflow> {
        if value > self.max_index {
            return Err(Overflow);
        }
        let width = self.id_width as usize;
        let raw = value.to_ne_bytes();
        let field = if cfg!(target_endian = "big") {
            &raw[8 - width..]
        } else {
            &raw[..width]
        };
        self.buf[at..at + width].copy_from_slice(field);
        Ok(())
    }

    /// Append an id value immediately (no patching).
    pub fn push_id(&mut self, value: u64) -> Result<(), Overflow> {
        let at = self.reserve_id();
        self.write_id_at(at, value)
    }

    /// Fail once the buffer itself outgrows the addressable range.
    pub fn check_capacity(&self) -> Result<(), Overflow> {
        if self.len() > self.max_index {
            return Err(Overflow);
        }
        Ok(())
    }

    pub fn take_refs(&mut self) -> (Vec<(usize, NodeId)>, Vec<(usize, OutputId)>) {
        (
            std::mem::take(&mut self.node_refs),
            std::mem::take(&mut self.output_refs),
        )
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
