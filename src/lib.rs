// Lockless leveled logging: per-producer ring channels fanned into one
// drain thread
//
// Producer threads acquire a private channel from a fixed-size pool and
// write through it without taking any lock; a single background thread
// drains every channel in order, renders lines to a sink, and reports
// messages lost to backpressure.

mod channel;
mod config;
mod drain;
mod engine;
mod error;
mod line;
#[macro_use]
mod macros;
mod pool;
mod severity;

// Public exports
pub use channel::ChannelWriter;
pub use config::{ConfigError, EngineConfig, OverflowPolicy, SinkKind};
pub use drain::{JsonLinesSink, LogSink, StderrSink, StdoutSink};
pub use engine::Engine;
pub use error::{EngineError, PoolError, WriteError};
pub use line::{LogLine, TEXT_MAX};
pub use severity::{Severity, SEVERITY_COUNT};
