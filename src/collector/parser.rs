//! Data line parser.
//!
//! Splits one line on `;`, trims each field and checks the field count
//! against the current headings. A count mismatch means the writer changed
//! its column layout, so the caller must reload the headings.

use crate::collector::headings::{FIELD_TRIM, HeadingSet};

/// Characters trimmed around a whole data line.
const LINE_TRIM: &[char] = &['\n', '\r', ';', ' '];

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Field count differs from the heading count.
    FieldCount { expected: usize, found: usize },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::FieldCount { expected, found } => write!(
                f,
                "field count mismatch: expected {} fields, got {}",
                expected, found
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Non-empty trimmed fields of one data line, borrowed from the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord<'a> {
    fields: Vec<&'a str>,
}

impl<'a> RawRecord<'a> {
    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Splits `line` into fields without checking them against headings.
pub fn split_fields(line: &str) -> RawRecord<'_> {
    let fields = line
        .trim_matches(LINE_TRIM)
        .split(';')
        .map(|field| field.trim_matches(FIELD_TRIM))
        .filter(|field| !field.is_empty())
        .collect();
    RawRecord { fields }
}

/// Parses `line` and validates its arity against `headings`.
pub fn parse_record<'a>(line: &'a str, headings: &HeadingSet) -> Result<RawRecord<'a>, ParseError> {
    let record = split_fields(line);
    if record.len() != headings.len() {
        return Err(ParseError::FieldCount {
            expected: headings.len(),
            found: record.len(),
        });
    }
    Ok(record)
}
