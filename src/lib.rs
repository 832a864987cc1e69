//! trident - streaming telemetry collector library.
//!
//! Turns semicolon-delimited measurement lines read from a named pipe into
//! metric points, grouped per metric and socket, for a metrics daemon.
//!
//! This library provides the core used by:
//! - `tridentd` - standalone daemon emitting JSON lines or collectd `PUTVAL` commands

pub mod collector;
pub mod config;
pub mod plugin;
pub mod sink;
pub mod util;
