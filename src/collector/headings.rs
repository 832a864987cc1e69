//! Headings side-file loader.
//!
//! The side-file holds one line of semicolon-delimited column labels. Only
//! the first line is used; quotes, spaces and line terminators around the
//! line and around each label are removed, and empty labels are dropped.

use std::path::Path;

use crate::collector::traits::FileSystem;

/// Characters trimmed around the whole heading line.
const LINE_TRIM: &[char] = &['\n', '\r', '"', ';', ' '];

/// Characters trimmed around each field, in headings and data lines alike.
pub(crate) const FIELD_TRIM: &[char] = &[' ', '"', '\n', '\r'];

/// Error type for loading headings.
#[derive(Debug)]
pub enum HeadingsError {
    /// The side-file could not be read (not created yet, permissions, ...).
    Unavailable(std::io::Error),
    /// The side-file holds no usable label.
    Empty,
}

impl std::fmt::Display for HeadingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadingsError::Unavailable(e) => write!(f, "headings unavailable: {}", e),
            HeadingsError::Empty => write!(f, "headings file has no column names"),
        }
    }
}

impl std::error::Error for HeadingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HeadingsError::Unavailable(e) => Some(e),
            HeadingsError::Empty => None,
        }
    }
}

/// Ordered column labels, positionally aligned with the data columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingSet {
    labels: Vec<String>,
}

impl HeadingSet {
    /// Builds a set from labels that are already normalized.
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Parses a heading line.
    pub fn parse(line: &str) -> Self {
        let labels = line
            .trim_matches(LINE_TRIM)
            .split(';')
            .map(|field| field.trim_matches(FIELD_TRIM))
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect();
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// Reads the headings side-file through `fs`.
///
/// Safe to call repeatedly; each call re-reads the file.
pub fn load_headings<F: FileSystem>(fs: &F, path: &Path) -> Result<HeadingSet, HeadingsError> {
    let content = fs
        .read_to_string(path)
        .map_err(HeadingsError::Unavailable)?;
    let first = content.split(['\n', '\r']).next().unwrap_or("");
    let headings = HeadingSet::parse(first);
    if headings.is_empty() {
        return Err(HeadingsError::Empty);
    }
    Ok(headings)
}
