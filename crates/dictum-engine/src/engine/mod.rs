//! Scanner, sinks, and tracing hooks.

mod scanner;
mod sink;
mod trace;


pub use scanner::{DeadEndPolicy, EngineError, Scanner};
pub use sink::{Flow, MatchCollector, OutputSink, SinkFn};
pub use trace::{NoopTracer, Tracer};
