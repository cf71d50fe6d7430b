//! Stage IO: scoped writers that tee stage output to a remote log channel.
//!
//! Nothing here touches the process-global streams. The engine builds a
//! fresh [`StageIo`] for every stage invocation and the stage writes to
//! it; when the value drops at the end of the call (on success or on
//! error) the writers flush and the scope is over.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Severity attached to a forwarded log record. `Info` for the
/// stdout-shaped writer, `Error` for the stderr-shaped one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// One unit of captured stage output, forwarded to the log channel.
/// Transient: records are never stored locally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub stage: String,
    pub level: LogLevel,
}

/// An append-only destination for stage output (a Redis stream in
/// production, an in-memory buffer in tests).
pub trait LogSink: Send + Sync {
    fn append(&self, record: &LogRecord) -> anyhow::Result<()>;
}

/// Writer that duplicates every write to a [`LogSink`].
///
/// The inner writer always sees the bytes first, unchanged, and is
/// flushed after every write; the forward is skipped for a bare newline
/// and a sink failure never surfaces to the caller.
pub struct TeeWriter<W: Write> {
    inner: W,
    sink: Arc<dyn LogSink>,
    stage: String,
    level: LogLevel,
}

impl<W: Write> TeeWriter<W> {
    pub fn new(inner: W, sink: Arc<dyn LogSink>, stage: impl Into<String>, level: LogLevel) -> Self {
        Self {
            inner,
            sink,
            stage: stage.into(),
            level,
        }
    }
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_all(buf)?;

        if buf != b"\n" && !buf.is_empty() {
            let record = LogRecord {
                text: String::from_utf8_lossy(buf).into_owned(),
                timestamp: Utc::now(),
                stage: self.stage.clone(),
                level: self.level,
            };
            if let Err(error) = self.sink.append(&record) {
                tracing::warn!(stage = %self.stage, %error, "failed to forward output to log channel");
            }
        }

        self.inner.flush()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Drop for TeeWriter<W> {
    fn drop(&mut self) {
        let _ = self.inner.flush();
    }
}

/// The writer pair handed to one stage invocation.
pub struct StageIo {
    stage: String,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl StageIo {
    /// Tee the process stdout/stderr to `sink`, tagged with `stage`.
    pub fn tee(sink: Arc<dyn LogSink>, stage: impl Into<String>) -> Self {
        let stage = stage.into();
        Self {
            out: Box::new(TeeWriter::new(
                io::stdout(),
                Arc::clone(&sink),
                stage.clone(),
                LogLevel::Info,
            )),
            err: Box::new(TeeWriter::new(
                io::stderr(),
                sink,
                stage.clone(),
                LogLevel::Error,
            )),
            stage,
        }
    }

    /// Custom writers; embedders and tests route output wherever they like.
    pub fn from_writers(
        stage: impl Into<String>,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            stage: stage.into(),
            out,
            err,
        }
    }

    /// Discards all output. Useful in unit tests of stage functions.
    pub fn null(stage: impl Into<String>) -> Self {
        Self::from_writers(stage, Box::new(io::sink()), Box::new(io::sink()))
    }

    pub fn out(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    pub fn err(&mut self) -> &mut dyn Write {
        &mut self.err
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }
}

/// Sink that keeps records in memory. Intended for tests of stage
/// functions and of the engine's tee behaviour.
#[derive(Default, Clone)]
pub struct MemoryLogSink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, record: &LogRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("memory log sink lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}
