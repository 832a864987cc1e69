//! Streaming telemetry collector.
//!
//! Reconstructs metric samples from semicolon-delimited lines arriving on a
//! named pipe, using column labels from a separate headings file.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Engine                            │
//! │  ┌────────────┐   ┌──────────┐   ┌─────────┐   ┌──────────┐  │
//! │  │ LineReader │──►│  parser  │──►│ grouper │──►│ interval │  │
//! │  └─────▲──────┘   └────▲─────┘   └─────────┘   └────┬─────┘  │
//! │        │               │ headings                   │        │
//! │        │          ┌────┴─────┐                      ▼        │
//! │        │          │ headings │                 MetricSink    │
//! │        │          └────▲─────┘                               │
//! │        └───────┬───────┘                                     │
//! │         ┌──────▼─────┐                                       │
//! │         │ FileSystem │ (trait)                               │
//! │         └──────┬─────┘                                       │
//! └────────────────┼─────────────────────────────────────────────┘
//!           ┌──────┴──────┐
//!    ┌──────▼──────┐ ┌────▼────────┐
//!    │   RealFs    │ │   MockFs    │
//!    │ (O_NONBLOCK)│ │ (Testing)   │
//!    └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use trident::collector::{Engine, MockFs};
//! use trident::config::TridentConfig;
//! use trident::sink::VecSink;
//!
//! let fs = MockFs::new();
//! fs.add_file("/tmp/tridentheadings", "timestamp;Temp S0 C0;Temp S0 C1\n");
//! let pipe = fs.add_pipe("/tmp/tridentfifo");
//! pipe.push("2020-01-01T00:00:00Z;41;43\n");
//!
//! let mut engine = Engine::new(fs, VecSink::new(), TridentConfig::default());
//! engine.init();
//! engine.poll_once().unwrap();
//! assert_eq!(engine.sink().points()[0].values, vec![Some(41), Some(43)]);
//! ```

mod engine;
pub mod grouper;
pub mod headings;
pub mod interval;
pub mod line_reader;
pub mod mock;
pub mod parser;
pub mod traits;

pub use engine::{Engine, EngineError, EngineState, LineError, PollSummary};
pub use grouper::{ColumnLayout, GroupKey, GroupedValues, RecordError};
pub use headings::{HeadingSet, HeadingsError, load_headings};
pub use interval::{Sample, TimestampState};
pub use line_reader::{LineEnding, LineReader, ReadEvent};
pub use mock::MockFs;
pub use parser::{ParseError, RawRecord, parse_record};
pub use traits::{FileSystem, RealFs};
