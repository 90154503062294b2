#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! dictum compiler: dictionary generator, optimizer passes, image emitter.
//!
//! The pipeline runs strictly left to right:
//! - `generate` — Aho-Corasick construction from fixed-width patterns into
//!   the intermediate automata
//! - `optimize` — independent, composable rewrite passes over the
//!   intermediate automata
//! - `emit` — layout of the intermediate automata into a compiled image,
//!   driven by a per-node byte cost model

pub mod emit;
pub mod generate;
pub mod optimize;

#[cfg(test)]
pub mod test_utils;

pub use emit::{Compiled, CompileError, CompileStats, Config, IdWidth, compile};
pub use generate::{AhoCorasickBuilder, GenerateError};
pub use optimize::{
    OptimizeError, canonicalize_edges, deduplicate_outputs, translate_nonadvancing,
    translate_nonadvancing_structural,
};
