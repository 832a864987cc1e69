//! Utility modules for trident.

mod hostname;
mod time_parser;

pub use hostname::hostname;
pub use time_parser::{TimeParseError, parse_timestamp};
