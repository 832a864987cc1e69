//! collectd plain-text protocol sink.
//!
//! Emits `PUTVAL` commands as understood by collectd's exec and unixsock
//! plugins:
//!
//! ```text
//! PUTVAL "host/trident/trident_temp-socket 1" interval=10 1577836800:10:20
//! ```
//!
//! A missing time is sent as `N` (now) and a missing value as `U`.

use std::io::Write;

use super::{MetricPoint, MetricSink, SinkError};

/// Writes each point as one `PUTVAL` line.
pub struct PutvalSink<W: Write> {
    out: W,
    host: String,
}

impl<W: Write> PutvalSink<W> {
    pub fn new(out: W, host: impl Into<String>) -> Self {
        Self {
            out,
            host: host.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats one point as a `PUTVAL` command, without the trailing newline.
pub fn format_putval(host: &str, point: &MetricPoint) -> String {
    let mut line = format!("PUTVAL \"{}/{}/{}", host, point.plugin, point.type_name);
    if let Some(instance) = &point.type_instance {
        line.push('-');
        line.push_str(instance);
    }
    line.push('"');
    if let Some(interval) = point.interval {
        line.push_str(&format!(" interval={}", interval));
    }
    line.push(' ');
    match point.time {
        Some(t) => line.push_str(&t.to_string()),
        None => line.push('N'),
    }
    for value in &point.values {
        match value {
            Some(v) => line.push_str(&format!(":{}", v)),
            None => line.push_str(":U"),
        }
    }
    line
}

impl<W: Write> MetricSink for PutvalSink<W> {
    fn dispatch(&mut self, point: MetricPoint) -> Result<(), SinkError> {
        let line = format_putval(&self.host, &point);
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}
