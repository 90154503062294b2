//! Core data structures for dictum.
//!
//! The intermediate automata model: a mutable, arena-indexed graph of nodes,
//! edges, and outputs that the generator builds, the optimizer rewrites, and
//! the image compiler consumes. Two ids address everything:
//! - `NodeId` — index into the node arena
//! - `OutputId` — index into the output arena
//!
//! Edges store ids, never references, so the arena is the sole owner and
//! cyclic graphs need no special handling.

pub mod automata;
pub mod byte_set;
pub mod serialize;
pub mod validate;

#[cfg(test)]
mod byte_set_tests;

pub use automata::{Automata, Edge, EdgeMatch, Node, NodeId, Output, OutputId, Transition};
pub use byte_set::ByteSet;
pub use serialize::{SerializeError, from_bytes, to_bytes};
pub use validate::{StructuralError, validate};
