//! Host lifecycle interface.
//!
//! A metrics daemon drives the collector through four synchronous calls:
//! configuration, initialization, periodic reads and shutdown. The host owns
//! exactly one implementor and calls it from a single thread.

use crate::collector::{Engine, EngineError, FileSystem, PollSummary};
use crate::config::ConfigError;
use crate::sink::MetricSink;

/// Lifecycle hooks invoked by the host.
pub trait Plugin {
    /// Applies host options (`Fifo`, `Headings`, `Interval`).
    fn apply_config(&mut self, options: &[(String, String)]) -> Result<(), ConfigError>;

    /// Prepares for reading. Also used to restart after `shutdown()`.
    fn init(&mut self);

    /// One read cycle. Errors are for logging; the next call may succeed.
    fn poll_once(&mut self) -> Result<PollSummary, EngineError>;

    /// Releases the stream. Only `init()` may follow.
    fn shutdown(&mut self);
}

impl<F: FileSystem, S: MetricSink> Plugin for Engine<F, S> {
    fn apply_config(&mut self, options: &[(String, String)]) -> Result<(), ConfigError> {
        Engine::apply_config(self, options)
    }

    fn init(&mut self) {
        Engine::init(self)
    }

    fn poll_once(&mut self) -> Result<PollSummary, EngineError> {
        Engine::poll_once(self)
    }

    fn shutdown(&mut self) {
        Engine::shutdown(self)
    }
}
