//! Metric points and the sinks that receive them.
//!
//! A [`MetricPoint`] is one grouped value vector with its type name,
//! optional socket instance, time and interval. Points are handed to a
//! [`MetricSink`] one at a time, in record order.

mod json;
mod putval;

pub use json::JsonLinesSink;
pub use putval::PutvalSink;

use serde::Serialize;

use crate::collector::GroupKey;

/// Plugin name attached to every point.
pub const PLUGIN_NAME: &str = "trident";

/// Prefix of every type name.
pub const TYPE_PREFIX: &str = "trident_";

/// Error type for sink failures.
#[derive(Debug)]
pub enum SinkError {
    /// Writing to the underlying output failed.
    Io(std::io::Error),
    /// The point could not be encoded.
    Encode(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "sink I/O error: {}", e),
            SinkError::Encode(msg) => write!(f, "sink encode error: {}", msg),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError::Io(e)
    }
}

/// One resolved sample ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricPoint {
    pub plugin: &'static str,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_instance: Option<String>,
    /// Seconds since the Unix epoch.
    pub time: Option<i64>,
    /// Seconds.
    pub interval: Option<u64>,
    pub values: Vec<Option<i64>>,
}

impl MetricPoint {
    /// Builds the point for one group of a record.
    ///
    /// A zero interval carries no information and is dropped.
    pub fn new(
        key: &GroupKey,
        values: Vec<Option<i64>>,
        time: Option<i64>,
        interval: Option<u64>,
    ) -> Self {
        Self {
            plugin: PLUGIN_NAME,
            type_name: type_name(&key.metric),
            type_instance: key.socket.map(|s| format!("socket {}", s)),
            time,
            interval: interval.filter(|&i| i > 0),
            values,
        }
    }
}

/// Derives the type name for a metric label.
///
/// Spaces, parentheses and backslashes become `_`, the result is
/// lower-cased and prefixed with [`TYPE_PREFIX`].
pub fn type_name(metric: &str) -> String {
    let mut name = String::with_capacity(TYPE_PREFIX.len() + metric.len());
    name.push_str(TYPE_PREFIX);
    for c in metric.chars() {
        match c {
            ' ' | '(' | ')' | '\\' => name.push('_'),
            _ => name.extend(c.to_lowercase()),
        }
    }
    name
}

/// Receiver of finished metric points.
pub trait MetricSink {
    /// Accepts one point. Points of one record arrive back to back.
    fn dispatch(&mut self, point: MetricPoint) -> Result<(), SinkError>;

    /// Called once at the end of every poll that dispatched points.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: MetricSink + ?Sized> MetricSink for Box<S> {
    fn dispatch(&mut self, point: MetricPoint) -> Result<(), SinkError> {
        (**self).dispatch(point)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Sink that keeps every point in memory.
#[derive(Debug, Default, Clone)]
pub struct VecSink {
    points: Vec<MetricPoint>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[MetricPoint] {
        &self.points
    }

    /// Removes and returns everything collected so far.
    pub fn take(&mut self) -> Vec<MetricPoint> {
        std::mem::take(&mut self.points)
    }
}

impl MetricSink for VecSink {
    fn dispatch(&mut self, point: MetricPoint) -> Result<(), SinkError> {
        self.points.push(point);
        Ok(())
    }
}
