//! In-memory mock filesystem for testing the engine without a real pipe.
//!
//! `MockFs` stores plain files as strings and exposes data streams as
//! scripted pipes. A [`PipeHandle`] plays the writer side: tests push byte
//! chunks, close the writer, or inject an I/O failure, and every stream
//! opened on that path observes the same script. An empty script reads as
//! `WouldBlock`, like a non-blocking FIFO with an idle writer.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
enum Scripted {
    Data(Vec<u8>),
    /// Writer closed. Sticky: every later read returns 0.
    Eof,
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
struct PipeState {
    script: VecDeque<Scripted>,
    opens: usize,
}

/// Writer side of a scripted pipe.
#[derive(Debug, Clone, Default)]
pub struct PipeHandle {
    state: Arc<Mutex<PipeState>>,
}

impl PipeHandle {
    fn lock(&self) -> MutexGuard<'_, PipeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues bytes to be returned by the next read.
    pub fn push(&self, bytes: impl AsRef<[u8]>) {
        self.lock()
            .script
            .push_back(Scripted::Data(bytes.as_ref().to_vec()));
    }

    /// Closes the writer side: reads report end-of-stream once the queued
    /// data is drained.
    pub fn close(&self) {
        self.lock().script.push_back(Scripted::Eof);
    }

    /// Queues a read failure with the given kind.
    pub fn fail(&self, kind: io::ErrorKind) {
        self.lock().script.push_back(Scripted::Fail(kind));
    }

    /// Drops the whole script, including a pending end-of-stream.
    pub fn reset(&self) {
        self.lock().script.clear();
    }

    /// Number of times a stream was opened on this pipe.
    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    /// Number of scripted entries not consumed yet.
    pub fn pending(&self) -> usize {
        self.lock().script.len()
    }
}

/// Reader side of a scripted pipe, returned by [`MockFs::open_stream`].
#[derive(Debug)]
pub struct MockStream {
    pipe: PipeHandle,
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.pipe.lock();
        match state.script.pop_front() {
            None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Some(Scripted::Eof) => {
                state.script.push_front(Scripted::Eof);
                Ok(0)
            }
            Some(Scripted::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            Some(Scripted::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    state.script.push_front(Scripted::Data(data.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

#[derive(Debug, Default)]
struct MockFsInner {
    files: HashMap<PathBuf, String>,
    pipes: HashMap<PathBuf, PipeHandle>,
}

/// In-memory filesystem for testing.
///
/// Clones share state, so a test can keep a handle after moving a clone
/// into the engine and keep editing files between polls.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    inner: Arc<Mutex<MockFsInner>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockFsInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds or replaces a file with the given content.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.lock()
            .files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Removes a file. Later reads fail with `NotFound`.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.lock().files.remove(path.as_ref());
    }

    /// Creates (or replaces) a pipe at `path` and returns its writer handle.
    pub fn add_pipe(&self, path: impl AsRef<Path>) -> PipeHandle {
        let handle = PipeHandle::default();
        self.lock()
            .pipes
            .insert(path.as_ref().to_path_buf(), handle.clone());
        handle
    }

    /// Removes the pipe at `path`. Later opens fail with `NotFound`.
    pub fn remove_pipe(&self, path: impl AsRef<Path>) {
        self.lock().pipes.remove(path.as_ref());
    }
}

fn not_found(what: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found: {:?}", what, path),
    )
}

impl FileSystem for MockFs {
    type Stream = MockStream;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("file", path))
    }

    fn open_stream(&self, path: &Path) -> io::Result<MockStream> {
        let pipe = self
            .lock()
            .pipes
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("pipe", path))?;
        pipe.lock().opens += 1;
        Ok(MockStream { pipe })
    }
}
