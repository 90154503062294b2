//! Dictionary-to-automata generation.

mod aho_corasick;

#[cfg(test)]
mod aho_corasick_tests;

pub use aho_corasick::{AhoCorasickBuilder, GenerateError};
