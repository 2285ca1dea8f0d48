//! Append-only log file sink for tracing.
//!
//! Writes are serialized through a mutex. The first failed write is reported
//! on stderr; later failures stay quiet until [`LogFile::reenable`] is called.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;

struct LogState {
    sink: Box<dyn Write + Send>,
    reported: bool,
    failures: usize,
}

/// Mutex-guarded log writer.
pub struct LogFile {
    state: Mutex<LogState>,
}

impl LogFile {
    /// Open `path` for appending, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(Self::from_writer(file))
    }

    pub fn from_writer(sink: impl Write + Send + 'static) -> Self {
        Self {
            state: Mutex::new(LogState {
                sink: Box::new(sink),
                reported: false,
                failures: 0,
            }),
        }
    }

    /// Append one record. Failures are counted, never returned.
    pub fn append(&self, buf: &[u8]) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let outcome = {
            let sink = &mut state.sink;
            sink.write_all(buf).and_then(|()| sink.flush())
        };
        if let Err(e) = outcome {
            state.failures += 1;
            if !state.reported {
                state.reported = true;
                eprintln!("orbsh: cannot write log file: {e} (further errors suppressed)");
            }
        }
    }

    /// Report the next failure again.
    pub fn reenable(&self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).reported = false;
    }

    /// Failed writes so far.
    pub fn failures(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).failures
    }

    /// Whether a failure has been reported since the last re-enable.
    pub fn is_suppressed(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).reported
    }
}

/// Per-event writer handed out to tracing.
pub struct LogWriter<'a>(&'a LogFile);

impl Write for LogWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(self)
    }
}
