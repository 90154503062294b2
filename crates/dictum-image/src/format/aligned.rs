//! Cache-line aligned owned storage.
//!
//! Mapped images start on a page boundary; owned copies should not behave
//! differently, so owned image bytes are kept in 64-byte aligned storage.
//! `Vec<u8>` guarantees nothing for `u8`, so the buffer is a `Vec` of
//! 64-byte blocks instead.

use std::ops::Deref;

#[repr(align(64))]
#[derive(Clone, Copy)]
struct Line([u8; 64]);

/// Immutable byte storage whose first byte sits on a 64-byte boundary.
#[derive(Clone)]
pub struct Aligned64 {
    lines: Vec<Line>,
    len: usize,
}

impl Aligned64 {
    /// Copy `bytes` into aligned storage.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut lines = Vec::with_capacity(bytes.len().div_ceil(64));
        let mut chunks = bytes.chunks_exact(64);
        for chunk in &mut chunks {
            let mut line = [0u8; 64];
            line.copy_from_slice(chunk);
            lines.push(Line(line));
        }
        let rest = chunks.remainder();
        if !rest.is_empty() {
            let mut line = [0u8; 64];
            line[..rest.len()].copy_from_slice(rest);
            lines.push(Line(line));
        }
        Self {
            lines,
            len: bytes.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        debug_assert!(self.len <= self.lines.len() * 64);
        // SAFETY: Line is repr(align(64)) around [u8; 64], so the Vec's
        // backing memory is contiguous initialized bytes; only `len` of them
        // are exposed.
        unsafe { std::slice::from_raw_parts(self.lines.as_ptr().cast::<u8>(), self.len) }
    }
}

impl Deref for Aligned64 {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for Aligned64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aligned64").field("len", &self.len).finish()
    }
}
