//! Append-mode text file sink.

use super::FlushSink;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends to a text file, opening and closing it around every write so the
/// file is never held open between flushes.
#[derive(Debug, Clone)]
pub struct AppendFileSink {
    path: PathBuf,
}

impl AppendFileSink {
    /// Sink for `path`. The file is created on first write if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FlushSink for AppendFileSink {
    fn append(&mut self, data: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(data.as_bytes())?;
        file.flush()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
