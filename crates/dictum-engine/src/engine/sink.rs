//! Output delivery.

/// What the sink wants the scanner to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop the scan; subsequent `run` calls become no-ops.
    Stop,
}

/// Receives every emitted output.
///
/// `position` is the number of stream bytes consumed when the emitting node
/// was entered, i.e. the index just past a matched pattern's last byte.
pub trait OutputSink {
    fn output(&mut self, position: u64, content: &[u8]) -> Flow;
}

/// Collects every `(position, content)` pair.
#[derive(Debug, Default)]
pub struct MatchCollector {
    pub matches: Vec<(u64, Vec<u8>)>,
}

impl MatchCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for MatchCollector {
    fn output(&mut self, position: u64, content: &[u8]) -> Flow {
        self.matches.push((position, content.to_vec()));
        Flow::Continue
    }
}

/// Adapts a closure into a sink.
pub struct SinkFn<F>(pub F);

impl<F: FnMut(u64, &[u8]) -> Flow> OutputSink for SinkFn<F> {
    fn output(&mut self, position: u64, content: &[u8]) -> Flow {
        (self.0)(position, content)
    }
}
