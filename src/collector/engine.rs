//! Poll-driven engine tying the stream, headings, grouping and sink together.
//!
//! # States
//!
//! ```text
//!                 open ok                 headings loaded
//! AwaitingStream ─────────► NeedHeadings ─────────────────► Streaming
//!       ▲                        ▲                              │
//!       │ eof / read error       │ field-count mismatch         │
//!       └────────────────────────┴──────────────────────────────┘
//!
//! shutdown() from any state ─► Closed ─► init() ─► AwaitingStream
//! ```
//!
//! Each [`Engine::poll_once`] call drains the lines currently available and
//! returns as soon as the stream reports that no more data is ready.

use std::ops::ControlFlow;

use tracing::{debug, error, info, warn};

use crate::collector::grouper::{ColumnLayout, RecordError, group_record};
use crate::collector::headings::{HeadingSet, load_headings};
use crate::collector::interval::TimestampState;
use crate::collector::line_reader::{LineReader, ReadEvent};
use crate::collector::parser::{parse_record, split_fields};
use crate::collector::traits::FileSystem;
use crate::config::{ConfigError, TridentConfig};
use crate::sink::{MetricPoint, MetricSink, SinkError};

/// Maximum number of lines consumed in a single `poll_once()` call.
/// Keeps a writer that never pauses from starving the caller.
const MAX_LINES_PER_POLL: usize = 10_000;

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No stream is open.
    AwaitingStream,
    /// Stream open, headings must be (re)loaded before the next record.
    NeedHeadings,
    /// Headings loaded, records are being consumed.
    Streaming,
    /// Shut down; only `init()` revives the engine.
    Closed,
}

/// Error that ends a poll.
#[derive(Debug)]
pub enum EngineError {
    /// Reading the stream failed. The stream has been closed.
    Stream(std::io::Error),
    /// `poll_once()` was called after `shutdown()`.
    Closed,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Stream(e) => write!(f, "stream read failed: {}", e),
            EngineError::Closed => write!(f, "engine is shut down"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Stream(e) => Some(e),
            EngineError::Closed => None,
        }
    }
}

/// Failure confined to one line. The poll goes on with the next line.
#[derive(Debug)]
pub enum LineError {
    /// The record could not be grouped; nothing was dispatched for it.
    Record(RecordError),
    /// The sink rejected a point; later points of the line were skipped.
    Sink(SinkError),
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineError::Record(e) => write!(f, "record dropped: {}", e),
            LineError::Sink(e) => write!(f, "dispatch failed: {}", e),
        }
    }
}

impl std::error::Error for LineError {}

/// What one `poll_once()` call did.
#[derive(Debug, Default)]
pub struct PollSummary {
    /// Non-blank lines consumed.
    pub lines: usize,
    /// Points handed to the sink.
    pub points: usize,
    /// Headings were loaded during this poll.
    pub headings_loaded: bool,
    /// A field-count mismatch forced a headings reload.
    pub reset: bool,
    /// The writer closed the stream; it is reopened on the next poll.
    pub stream_ended: bool,
    pub line_errors: Vec<LineError>,
}

/// Streaming parse-and-group engine.
///
/// Owns the stream, the current headings and the timestamp history.
pub struct Engine<F: FileSystem, S: MetricSink> {
    fs: F,
    sink: S,
    config: TridentConfig,
    state: EngineState,
    reader: Option<LineReader<F::Stream>>,
    headings: HeadingSet,
    layout: ColumnLayout,
    timestamps: TimestampState,
}

impl<F: FileSystem, S: MetricSink> Engine<F, S> {
    pub fn new(fs: F, sink: S, config: TridentConfig) -> Self {
        let timestamps = TimestampState::new(config.interval_secs);
        Self {
            fs,
            sink,
            config,
            state: EngineState::AwaitingStream,
            reader: None,
            headings: HeadingSet::default(),
            layout: ColumnLayout::default(),
            timestamps,
        }
    }

    /// Resets the engine to a fresh state, closing any open stream.
    ///
    /// Configuration and sink are kept.
    pub fn init(&mut self) {
        self.reader = None;
        self.state = EngineState::AwaitingStream;
        self.headings = HeadingSet::default();
        self.layout = ColumnLayout::default();
        self.timestamps = TimestampState::new(self.config.interval_secs);
        debug!(
            "Engine initialized: fifo={:?}, headings={:?}, interval={}s",
            self.config.fifo_path, self.config.headings_path, self.config.interval_secs
        );
    }

    /// Applies host options. On error nothing changes.
    ///
    /// New paths are used from the next stream open; the interval applies
    /// immediately.
    pub fn apply_config(&mut self, options: &[(String, String)]) -> Result<(), ConfigError> {
        self.config.apply_options(options)?;
        self.timestamps
            .set_configured_interval(self.config.interval_secs);
        Ok(())
    }

    /// Closes the stream and stops the engine.
    pub fn shutdown(&mut self) {
        if self.reader.take().is_some() {
            debug!("Closed stream {:?}", self.config.fifo_path);
        }
        if self.state != EngineState::Closed {
            info!("Trident engine shut down");
        }
        self.state = EngineState::Closed;
    }

    /// Processes all input available right now.
    ///
    /// Opens the stream first if needed. Never blocks waiting for data.
    pub fn poll_once(&mut self) -> Result<PollSummary, EngineError> {
        if self.state == EngineState::Closed {
            return Err(EngineError::Closed);
        }

        let mut summary = PollSummary::default();
        if self.reader.is_none() && !self.open_stream() {
            return Ok(summary);
        }

        let mut consumed = 0;
        while consumed < MAX_LINES_PER_POLL {
            let Some(reader) = self.reader.as_mut() else {
                break;
            };
            let event = match reader.next_event() {
                Ok(event) => event,
                Err(e) => {
                    error!("Reading {:?} failed: {}", self.config.fifo_path, e);
                    self.close_stream();
                    self.flush_sink(&mut summary);
                    return Err(EngineError::Stream(e));
                }
            };

            match event {
                ReadEvent::NoData => break,
                ReadEvent::Eof => {
                    debug!("Writer closed {:?}", self.config.fifo_path);
                    self.close_stream();
                    summary.stream_ended = true;
                    break;
                }
                ReadEvent::Line(line) => {
                    consumed += 1;
                    if self.process_line(&line, &mut summary).is_break() {
                        break;
                    }
                }
            }
        }

        self.flush_sink(&mut summary);
        debug!(
            "Poll: {} lines, {} points, {} errors",
            summary.lines,
            summary.points,
            summary.line_errors.len()
        );
        Ok(summary)
    }

    /// Handles one line. `Break` ends the poll.
    fn process_line(&mut self, line: &str, summary: &mut PollSummary) -> ControlFlow<()> {
        if split_fields(line).is_empty() {
            return ControlFlow::Continue(());
        }
        summary.lines += 1;

        if self.state == EngineState::NeedHeadings {
            match load_headings(&self.fs, &self.config.headings_path) {
                Ok(headings) => {
                    debug!("Loaded {} headings", headings.len());
                    self.layout = ColumnLayout::new(&headings);
                    self.headings = headings;
                    self.state = EngineState::Streaming;
                    summary.headings_loaded = true;
                }
                Err(e) => {
                    debug!("Headings not ready ({:?}): {}", self.config.headings_path, e);
                    return ControlFlow::Break(());
                }
            }
        }

        let record = match parse_record(line, &self.headings) {
            Ok(record) => record,
            Err(e) => {
                warn!("{}; reloading headings", e);
                self.state = EngineState::NeedHeadings;
                summary.reset = true;
                return ControlFlow::Break(());
            }
        };

        let grouped = match group_record(&self.layout, &self.headings, &record) {
            Ok(grouped) => grouped,
            Err(e) => {
                warn!("Dropping record: {}", e);
                summary.line_errors.push(LineError::Record(e));
                return ControlFlow::Continue(());
            }
        };

        let (time, interval) = self.resolve_time(&grouped.timestamps);
        for (key, values) in grouped.values {
            let point = MetricPoint::new(&key, values, time, interval);
            if let Err(e) = self.sink.dispatch(point) {
                warn!("Dispatch failed: {}", e);
                summary.line_errors.push(LineError::Sink(e));
                break;
            }
            summary.points += 1;
        }
        ControlFlow::Continue(())
    }

    /// Time and interval for a record.
    ///
    /// Without a timestamp column the current interval applies; with an
    /// unparseable one the record carries neither.
    fn resolve_time(&mut self, timestamps: &[&str]) -> (Option<i64>, Option<u64>) {
        if timestamps.is_empty() {
            return (None, Some(self.timestamps.current_interval()));
        }
        let mut resolved = (None, None);
        for text in timestamps {
            match self.timestamps.observe_text(text) {
                Ok(sample) => resolved = (Some(sample.epoch), Some(sample.interval)),
                Err(e) => warn!("Skipping timestamp: {}", e),
            }
        }
        resolved
    }

    /// Opens the stream. Returns `false` if it is not available yet.
    fn open_stream(&mut self) -> bool {
        match self.fs.open_stream(&self.config.fifo_path) {
            Ok(stream) => {
                self.close_stream();
                self.reader = Some(LineReader::new(stream));
                self.state = EngineState::NeedHeadings;
                debug!("Opened stream {:?}", self.config.fifo_path);
                true
            }
            Err(e) => {
                debug!(
                    "Stream {:?} not available: {}",
                    self.config.fifo_path, e
                );
                self.state = EngineState::AwaitingStream;
                false
            }
        }
    }

    fn close_stream(&mut self) {
        self.reader = None;
        if self.state != EngineState::Closed {
            self.state = EngineState::AwaitingStream;
        }
    }

    fn flush_sink(&mut self, summary: &mut PollSummary) {
        if summary.points == 0 {
            return;
        }
        if let Err(e) = self.sink.flush() {
            warn!("Sink flush failed: {}", e);
            summary.line_errors.push(LineError::Sink(e));
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn headings(&self) -> &HeadingSet {
        &self.headings
    }

    pub fn timestamp_state(&self) -> &TimestampState {
        &self.timestamps
    }

    pub fn config(&self) -> &TridentConfig {
        &self.config
    }

    /// Whether a stream is currently open.
    pub fn is_stream_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Bytes buffered from the open stream without a line terminator.
    pub fn buffered_bytes(&self) -> usize {
        self.reader.as_ref().map_or(0, LineReader::buffered)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
