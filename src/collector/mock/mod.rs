//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and scripted pipe handles for testing the
//! engine without a real named pipe or headings file.

mod filesystem;

pub use filesystem::{MockFs, MockStream, PipeHandle};
