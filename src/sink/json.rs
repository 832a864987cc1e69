//! JSON lines sink: one object per metric point.

use std::io::Write;

use super::{MetricPoint, MetricSink, SinkError};

/// Writes each point as a single-line JSON object.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MetricSink for JsonLinesSink<W> {
    fn dispatch(&mut self, point: MetricPoint) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.out, &point).map_err(|e| {
            if e.is_io() {
                SinkError::Io(e.into())
            } else {
                SinkError::Encode(e.to_string())
            }
        })?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::GroupKey;

    #[test]
    fn test_json_line_with_instance() {
        let key = GroupKey {
            metric: "Temp".to_string(),
            socket: Some(1),
        };
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.dispatch(MetricPoint::new(&key, vec![Some(10), None], Some(1577836800), Some(10)))
            .unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            out,
            "{\"plugin\":\"trident\",\"type\":\"trident_temp\",\"type_instance\":\"socket 1\",\
             \"time\":1577836800,\"interval\":10,\"values\":[10,null]}\n"
        );
    }

    #[test]
    fn test_json_line_without_instance() {
        let key = GroupKey {
            metric: "IPC".to_string(),
            socket: None,
        };
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.dispatch(MetricPoint::new(&key, vec![Some(2)], None, None))
            .unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(value["type"], "trident_ipc");
        assert!(value.get("type_instance").is_none());
        assert!(value["time"].is_null());
    }
}
