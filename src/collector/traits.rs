//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait lets the engine read the headings side-file and
//! open the telemetry stream either from the real filesystem (a named pipe
//! opened non-blocking) or from an in-memory mock with scripted reads.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Abstraction for filesystem operations.
///
/// This trait allows the engine to read from the real filesystem or from
/// a mock implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Byte stream returned by [`FileSystem::open_stream`].
    ///
    /// A read that would block must fail with `io::ErrorKind::WouldBlock`.
    type Stream: Read;

    /// Reads the entire contents of a file as a string.
    ///
    /// # Arguments
    /// * `path` - Path to the file to read
    ///
    /// # Returns
    /// The file contents as a string, or an I/O error if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Opens the data stream read-only without blocking.
    ///
    /// Opening a FIFO that has no writer yet must succeed; reads from it
    /// then report end-of-stream until a writer appears.
    fn open_stream(&self, path: &Path) -> io::Result<Self::Stream>;
}

/// Real filesystem implementation that delegates to `std::fs`.
///
/// Use this in production to read from the actual named pipe.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    type Stream = File;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        // The side-file may be written in a legacy locale encoding.
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    #[cfg(unix)]
    fn open_stream(&self, path: &Path) -> io::Result<File> {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
    }

    #[cfg(not(unix))]
    fn open_stream(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }
}
