//! Output sink for everything the interpreter prints.
//!
//! Commands never touch stdout directly; they write through [`Output`], which
//! can be pointed at stdout, stderr, a file, or a shared in-memory buffer.
//! One previous destination is remembered so `output -` can switch back.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory capture buffer, cloneable so the writer and reader share it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Drain the buffer.
    pub fn take(&self) -> String {
        let mut bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let text = String::from_utf8_lossy(&bytes).into_owned();
        bytes.clear();
        text
    }

    fn append(&self, data: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
    }
}

/// Where output goes.
#[derive(Debug)]
pub enum Sink {
    Stdout,
    Stderr,
    File(File),
    Buffer(SharedBuffer),
}

impl Sink {
    /// Create (truncating) a file sink.
    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        File::create(path).map(Sink::File)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Sink::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(data)?;
                out.flush()
            }
            Sink::Stderr => io::stderr().lock().write_all(data),
            Sink::File(file) => file.write_all(data),
            Sink::Buffer(buf) => {
                buf.append(data);
                Ok(())
            }
        }
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Stdout => write!(f, "stdout"),
            Sink::Stderr => write!(f, "stderr"),
            Sink::File(_) => write!(f, "file"),
            Sink::Buffer(_) => write!(f, "buffer"),
        }
    }
}

#[derive(Debug)]
struct Sinks {
    current: Sink,
    previous: Option<Sink>,
}

/// The interpreter's output destination.
#[derive(Debug)]
pub struct Output {
    sinks: Mutex<Sinks>,
}

impl Output {
    /// Output starting at the given sink.
    pub fn new(sink: Sink) -> Self {
        Self {
            sinks: Mutex::new(Sinks {
                current: sink,
                previous: None,
            }),
        }
    }

    /// Output captured into a fresh buffer; returns both.
    pub fn buffered() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (Self::new(Sink::Buffer(buffer.clone())), buffer)
    }

    /// Write text as-is.
    pub fn write_str(&self, text: &str) {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = sinks.current.write_all(text.as_bytes()) {
            tracing::warn!("output write failed: {e}");
        }
    }

    /// Write text followed by a newline.
    pub fn println(&self, text: impl fmt::Display) {
        self.write_str(&format!("{text}\n"));
    }

    /// Switch to a new sink, remembering the current one.
    ///
    /// Only one previous destination is kept; a second redirect forgets the
    /// first.
    pub fn redirect(&self, sink: Sink) {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        let old = std::mem::replace(&mut sinks.current, sink);
        tracing::debug!(from = %old, to = %sinks.current, "output redirected");
        sinks.previous = Some(old);
    }

    /// Switch back to the remembered sink. Returns false if there was none.
    pub fn restore(&self) -> bool {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        match sinks.previous.take() {
            Some(prev) => {
                sinks.current = prev;
                true
            }
            None => false,
        }
    }

    /// Name of the current sink.
    pub fn describe(&self) -> String {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .to_string()
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new(Sink::Stdout)
    }
}
