//! Line-delimited JSON output
//!
//! Every record becomes one compact JSON object followed by `\n`. A sink is
//! opened once, written many times and finished once; [`JsonlSink::finish`]
//! consumes it.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::ComputeError;

/// Buffered JSONL writer
pub struct JsonlSink<W: Write> {
    writer: Option<BufWriter<W>>,
    written: usize,
}

impl JsonlSink<File> {
    /// Create (or truncate) an output file
    pub fn create(path: &Path) -> Result<Self, ComputeError> {
        Ok(Self::new(File::create(path)?))
    }
}

impl JsonlSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Some(BufWriter::new(inner)),
            written: 0,
        }
    }

    /// Append one record as a JSON line
    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<(), ComputeError> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            ComputeError::Io(io::Error::new(io::ErrorKind::Other, "sink already finished"))
        })?;
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of lines written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush buffered lines and release the writer, returning the line count
    pub fn finish(mut self) -> Result<usize, ComputeError> {
        if let Some(writer) = self.writer.take() {
            writer.into_inner().map_err(|e| e.into_error())?.flush()?;
        }
        Ok(self.written)
    }

    /// Finish and hand back the underlying writer
    pub fn into_inner(mut self) -> Result<W, ComputeError> {
        let writer = self.writer.take().ok_or_else(|| {
            ComputeError::Io(io::Error::new(io::ErrorKind::Other, "sink already finished"))
        })?;
        let mut inner = writer.into_inner().map_err(|e| e.into_error())?;
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> Drop for JsonlSink<W> {
    fn drop(&mut self) {
        // unfinished sinks (aborted runs) still get their lines out
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                tracing::warn!(error = %e, "failed to flush unfinished sink");
            }
        }
    }
}
