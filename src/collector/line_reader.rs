//! Incremental line reader over a non-blocking byte stream.
//!
//! Bytes are buffered across reads until a line terminator arrives. `\n`,
//! `\r` and `\r\n` all end a line; whichever terminator occurs first in the
//! buffer decides the split. A read that would block is reported as
//! [`ReadEvent::NoData`] instead of blocking the caller.

use std::io::{self, Read};

/// Size of a single read from the stream.
const READ_CHUNK_SIZE: usize = 8192;

/// Outcome of one [`LineReader::next_event`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// A complete line.
    Line(String),
    /// Nothing buffered and the stream has no data right now.
    NoData,
    /// The writer closed the stream and every buffered byte was returned.
    Eof,
}

/// How the line terminator appears in returned lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Terminator removed.
    #[default]
    Strip,
    /// Terminator replaced by a single `\n`.
    Normalize,
}

/// Turns raw byte chunks into complete lines.
///
/// A reader is bound to one stream; reopening the stream means building a
/// new reader, which starts with an empty buffer.
pub struct LineReader<R> {
    stream: R,
    buf: Vec<u8>,
    ending: LineEnding,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    /// Creates a reader that strips line terminators.
    pub fn new(stream: R) -> Self {
        Self::with_ending(stream, LineEnding::Strip)
    }

    pub fn with_ending(stream: R, ending: LineEnding) -> Self {
        Self {
            stream,
            buf: Vec::with_capacity(READ_CHUNK_SIZE),
            ending,
            eof: false,
        }
    }

    /// Returns the next complete line, reading from the stream only when
    /// the buffer holds no terminator.
    ///
    /// Errors other than `WouldBlock` and `Interrupted` are returned as-is;
    /// the stream should be considered dead afterwards.
    pub fn next_event(&mut self) -> io::Result<ReadEvent> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(ReadEvent::Line(line));
            }
            if self.eof {
                return Ok(ReadEvent::Eof);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    if !self.buf.is_empty() {
                        let rest = std::mem::take(&mut self.buf);
                        return Ok(ReadEvent::Line(self.decode(&rest, true)));
                    }
                    return Ok(ReadEvent::Eof);
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(ReadEvent::NoData),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Number of bytes buffered without a terminator yet.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Splits the first complete line off the buffer.
    fn take_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n' || b == b'\r')?;
        let consumed = if self.buf[pos] == b'\r' && self.buf.get(pos + 1) == Some(&b'\n') {
            pos + 2
        } else {
            pos + 1
        };
        let line = self.decode(&self.buf[..pos], false);
        self.buf.drain(..consumed);
        Some(line)
    }

    fn decode(&self, bytes: &[u8], at_eof: bool) -> String {
        let mut line = String::from_utf8_lossy(bytes).into_owned();
        if self.ending == LineEnding::Normalize && !at_eof {
            line.push('\n');
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    fn reader(fs: &MockFs) -> LineReader<crate::collector::mock::MockStream> {
        LineReader::new(fs.open_stream(Path::new("/fifo")).unwrap())
    }

    fn line(s: &str) -> ReadEvent {
        ReadEvent::Line(s.to_string())
    }

    #[test]
    fn test_line_split_across_reads() {
        let fs = MockFs::new();
        let pipe = fs.add_pipe("/fifo");
        let mut r = reader(&fs);

        pipe.push("a;b");
        assert_eq!(r.next_event().unwrap(), ReadEvent::NoData);
        assert_eq!(r.buffered(), 3);

        pipe.push(";c\n");
        assert_eq!(r.next_event().unwrap(), line("a;b;c"));
        assert_eq!(r.next_event().unwrap(), ReadEvent::NoData);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn test_all_terminators() {
        let fs = MockFs::new();
        let pipe = fs.add_pipe("/fifo");
        let mut r = reader(&fs);

        pipe.push("one\ntwo\rthree\r\nfour\n");
        assert_eq!(r.next_event().unwrap(), line("one"));
        assert_eq!(r.next_event().unwrap(), line("two"));
        assert_eq!(r.next_event().unwrap(), line("three"));
        assert_eq!(r.next_event().unwrap(), line("four"));
        assert_eq!(r.next_event().unwrap(), ReadEvent::NoData);
    }

    #[test]
    fn test_lf_before_cr() {
        let fs = MockFs::new();
        let pipe = fs.add_pipe("/fifo");
        let mut r = reader(&fs);

        pipe.push("a\n\rb\n");
        assert_eq!(r.next_event().unwrap(), line("a"));
        assert_eq!(r.next_event().unwrap(), line(""));
        assert_eq!(r.next_event().unwrap(), line("b"));
    }

    #[test]
    fn test_normalized_ending() {
        let fs = MockFs::new();
        let pipe = fs.add_pipe("/fifo");
        let stream = fs.open_stream(Path::new("/fifo")).unwrap();
        let mut r = LineReader::with_ending(stream, LineEnding::Normalize);

        pipe.push("x\r\ny\rz");
        pipe.close();
        assert_eq!(r.next_event().unwrap(), line("x\n"));
        assert_eq!(r.next_event().unwrap(), line("y\n"));
        assert_eq!(r.next_event().unwrap(), line("z"));
        assert_eq!(r.next_event().unwrap(), ReadEvent::Eof);
    }

    #[test]
    fn test_leftover_returned_at_eof() {
        let fs = MockFs::new();
        let pipe = fs.add_pipe("/fifo");
        let mut r = reader(&fs);

        pipe.push("1;2\n3;4");
        pipe.close();
        assert_eq!(r.next_event().unwrap(), line("1;2"));
        assert_eq!(r.next_event().unwrap(), line("3;4"));
        assert_eq!(r.next_event().unwrap(), ReadEvent::Eof);
        assert_eq!(r.next_event().unwrap(), ReadEvent::Eof);
    }

    #[test]
    fn test_eof_without_leftover() {
        let fs = MockFs::new();
        let pipe = fs.add_pipe("/fifo");
        let mut r = reader(&fs);

        pipe.close();
        assert_eq!(r.next_event().unwrap(), ReadEvent::Eof);
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let fs = MockFs::new();
        let pipe = fs.add_pipe("/fifo");
        let mut r = reader(&fs);

        pipe.fail(io::ErrorKind::Interrupted);
        pipe.push("ok\n");
        assert_eq!(r.next_event().unwrap(), line("ok"));
    }

    #[test]
    fn test_other_errors_propagate() {
        let fs = MockFs::new();
        let pipe = fs.add_pipe("/fifo");
        let mut r = reader(&fs);

        pipe.fail(io::ErrorKind::BrokenPipe);
        let err = r.next_event().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_long_line_over_several_chunks() {
        let fs = MockFs::new();
        let pipe = fs.add_pipe("/fifo");
        let mut r = reader(&fs);

        let long = "7;".repeat(READ_CHUNK_SIZE);
        pipe.push(format!("{}\n", long));
        assert_eq!(r.next_event().unwrap(), line(&long));
    }
}
