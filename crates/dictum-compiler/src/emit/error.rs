//! Emission errors and statistics.

/// A failed compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("invalid automata: {0}")]
    Invalid(#[from] dictum_core::StructuralError),

    #[error(
        "id width {width} cannot address the compiled image; use a wider or automatic width"
    )]
    IdWidthTooSmall { width: u8 },

    #[error("automata cannot be addressed at any id width")]
    AddressSpaceExhausted,

    #[error("alignment must be at least 1")]
    ZeroAlignment,

    #[error("high node weight must be positive and finite, got {weight}")]
    BadWeight { weight: f64 },
}

/// What the emitter produced, by physical encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub low_nodes: usize,
    pub low_node_bytes: usize,
    pub high_nodes: usize,
    pub high_node_bytes: usize,
    pub pc_nodes: usize,
    pub pc_node_bytes: usize,
    pub padding_bytes: usize,
    /// Distinct addressable records (node records plus output records).
    pub ids_used: usize,
}

impl CompileStats {
    pub fn node_records(&self) -> usize {
        self.low_nodes + self.high_nodes + self.pc_nodes
    }
}
