//! In-memory sink recording every write.

use super::FlushSink;

/// Records each write as a separate entry. Supports failure injection.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    writes: Vec<String>,
    fail_next: bool,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `append` fail with an I/O error.
    pub fn trigger_failure(&mut self) {
        self.fail_next = true;
    }

    /// All writes, one entry per `append` call.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// Concatenation of all writes, i.e. what a file would contain.
    pub fn contents(&self) -> String {
        self.writes.concat()
    }

    /// Persisted lines, without their terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl FlushSink for MemorySink {
    fn append(&mut self, data: &str) -> std::io::Result<()> {
        if std::mem::take(&mut self.fail_next) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            ));
        }
        self.writes.push(data.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("MemorySink ({} writes)", self.writes.len())
    }
}
