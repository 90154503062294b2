//! The execution loop.
//!
//! A scanner holds a borrowed image plus its own cursor: the current node
//! record offset, the absolute stream position, and progress inside a
//! path-compressed chain. `run` may be called repeatedly with consecutive
//! chunks of one stream; state carries across calls, so a pattern spanning
//! a chunk boundary still matches.
//!
//! Per step: emit the entered node's outputs (suppressed on non-consuming
//! entry when the image says so), then dispatch the current byte through
//! the record — table lookup, linear scan, or literal-chain comparison —
//! falling back to the default transition, and finally to the dead-end
//! policy. Non-advancing hops are bounded by the record count; exceeding
//! that means the image is corrupt, not that the input is bad.

use dictum_image::format::{FormatError, Image, NodeRecord};

use super::sink::{Flow, OutputSink};
use super::trace::{NoopTracer, Tracer};

/// What to do when a node has no transition for the current byte.
///
/// Automata built by the dictionary generator carry a universal fallback at
/// the start node, so they never dead-end; hand-built automata may.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeadEndPolicy {
    /// Stop matching for the remainder of the stream.
    #[default]
    Halt,
    /// Re-enter the start node with the byte still unconsumed; if the start
    /// node itself dead-ends on that byte, consume it.
    RestartAtStart,
}

/// A failed scan. Input contents never cause errors; these all mean the
/// image bytes are not what the loader vouched for.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("corrupt image: {0}")]
    Format(#[from] FormatError),

    #[error("non-advancing transitions looped at offset {offset}")]
    NonadvancingLoop { offset: u64 },

    #[error("output chain looped at offset {offset}")]
    OutputLoop { offset: u64 },
}

enum Step {
    /// Move to `target`. `consume` eats the current byte now; `advancing`
    /// says whether the entry consumed input (chain entries consume during
    /// the chain walk, so they enter with `consume: false`).
    Enter {
        target: u64,
        consume: bool,
        advancing: bool,
    },
    /// Stay inside the current record (mid-chain).
    Stay,
    DeadEnd,
}

/// Streaming executor over one compiled image.
pub struct Scanner<'a> {
    image: &'a Image,
    policy: DeadEndPolicy,
    node: u64,
    position: u64,
    pc_progress: usize,
    entered: bool,
    finished: bool,
    stopped: bool,
    idle_steps: u64,
}

impl<'a> Scanner<'a> {
    pub fn new(image: &'a Image) -> Self {
        Self {
            image,
            policy: DeadEndPolicy::default(),
            node: image.start_offset(),
            position: 0,
            pc_progress: 0,
            entered: false,
            finished: false,
            stopped: false,
            idle_steps: 0,
        }
    }

    pub fn dead_end_policy(mut self, policy: DeadEndPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bytes consumed so far, across all `run` calls.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// True once the scan can produce nothing further (dead end under the
    /// `Halt` policy, or the sink asked to stop).
    pub fn halted(&self) -> bool {
        self.finished || self.stopped
    }

    /// Rewind to the start node and position zero.
    pub fn reset(&mut self) {
        self.node = self.image.start_offset();
        self.position = 0;
        self.pc_progress = 0;
        self.entered = false;
        self.finished = false;
        self.stopped = false;
        self.idle_steps = 0;
    }

    /// Execute over the next chunk of the stream.
    pub fn run<S: OutputSink>(&mut self, input: &[u8], sink: &mut S) -> Result<(), EngineError> {
        self.run_with_tracer(input, sink, &mut NoopTracer)
    }

    /// Execute with a tracing hook observing every node entry.
    pub fn run_with_tracer<S: OutputSink, T: Tracer>(
        &mut self,
        input: &[u8],
        sink: &mut S,
        tracer: &mut T,
    ) -> Result<(), EngineError> {
        if self.halted() {
            return Ok(());
        }
        let image = self.image;

        // The very first entry into the start node, before any input.
        if !self.entered {
            self.entered = true;
            tracer.enter(self.node, self.position);
            if !self.emit_outputs(self.node, sink)? {
                self.stopped = true;
                return Ok(());
            }
        }

        let mut i = 0usize;
        while i < input.len() {
            let b = input[i];
            let record = image.node_at(self.node)?;

            let step = match &record {
                NodeRecord::Path(p) => {
                    if self.pc_progress < p.chain.len() && b == p.chain[self.pc_progress] {
                        i += 1;
                        self.position += 1;
                        self.idle_steps = 0;
                        self.pc_progress += 1;
                        if self.pc_progress == p.chain.len() {
                            self.pc_progress = 0;
                            Step::Enter {
                                target: p.final_target,
                                consume: false,
                                advancing: p.advance_on_final,
                            }
                        } else {
                            Step::Stay
                        }
                    } else {
                        self.pc_progress = 0;
                        default_step(p.default_target, p.advance_on_default)
                    }
                }
                NodeRecord::Low(l) => match l.lookup(b) {
                    Some((target, advance)) => Step::Enter {
                        target,
                        consume: advance,
                        advancing: advance,
                    },
                    None => default_step(l.default_target, l.advance_on_default),
                },
                NodeRecord::High(h) => match h.lookup(b) {
                    Some((target, advance)) => Step::Enter {
                        target,
                        consume: advance,
                        advancing: advance,
                    },
                    None => default_step(h.default_target, h.advance_on_default),
                },
            };

            match step {
                Step::Stay => {}
                Step::DeadEnd => match self.policy {
                    DeadEndPolicy::Halt => {
                        self.finished = true;
                        return Ok(());
                    }
                    DeadEndPolicy::RestartAtStart => {
                        if self.node == image.start_offset() {
                            i += 1;
                            self.position += 1;
                            self.idle_steps = 0;
                        } else {
                            self.node = image.start_offset();
                            self.pc_progress = 0;
                            self.bump_idle()?;
                        }
                    }
                },
                Step::Enter {
                    target,
                    consume,
                    advancing,
                } => {
                    if consume {
                        i += 1;
                        self.position += 1;
                        self.idle_steps = 0;
                    } else if !advancing {
                        self.bump_idle()?;
                    }
                    self.node = target;
                    tracer.enter(target, self.position);

                    if advancing || !image.no_advance_no_output() {
                        if !self.emit_outputs(target, sink)? {
                            self.stopped = true;
                            return Ok(());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Emit the output chain of the node record at `offset`. Returns false
    /// if the sink asked to stop.
    fn emit_outputs<S: OutputSink>(&self, offset: u64, sink: &mut S) -> Result<bool, EngineError> {
        let mut cursor = self.image.node_at(offset)?.first_output();
        let mut hops = 0u64;
        while cursor != 0 {
            let (record, _) = self.image.output_at(cursor)?;
            if sink.output(self.position, record.content) == Flow::Stop {
                return Ok(false);
            }
            hops += 1;
            if hops > self.image.header().output_count {
                return Err(EngineError::OutputLoop { offset: cursor });
            }
            cursor = record.next;
        }
        Ok(true)
    }

    fn bump_idle(&mut self) -> Result<(), EngineError> {
        self.idle_steps += 1;
        if self.idle_steps > self.image.header().node_count {
            return Err(EngineError::NonadvancingLoop { offset: self.node });
        }
        Ok(())
    }
}

fn default_step(default_target: u64, advance_on_default: bool) -> Step {
    if default_target != 0 {
        Step::Enter {
            target: default_target,
            consume: advance_on_default,
            advancing: advance_on_default,
        }
    } else {
        Step::DeadEnd
    }
}
