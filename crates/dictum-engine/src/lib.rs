//! Execution engine for compiled dictum automata images.
//!
//! A [`Scanner`](engine::Scanner) walks an image in place against a byte
//! stream, emitting outputs to a caller-supplied sink. All run state lives
//! in the scanner, so any number of scanners may execute concurrently over
//! one shared image.

pub mod engine;

pub use engine::{
    DeadEndPolicy, EngineError, Flow, MatchCollector, NoopTracer, OutputSink, Scanner, SinkFn, Tracer,
};
