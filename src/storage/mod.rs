//! Output file persistence.
//!
//! Readings are accumulated by [`BufferedWriter`] and pushed to a
//! [`FlushSink`] in batches. The production sink is [`AppendFileSink`]; tests
//! use [`MemorySink`].
//!
//! ## File layout
//!
//! ```text
//!
//! * * * *
//! <comment>
//! * * * *
//! <data_header>
//! <data_units>
//! YYYY.MM.DD,HH:MM:SS:mmm,<frequency>,<temperature>
//! ...
//! ```
//!
//! Every run appends a fresh header block; existing content is never
//! truncated or rewritten.

pub mod buffered;
pub mod file;
pub mod memory;

pub use buffered::{BufferedWriter, DEFAULT_BUFFER_LEN};
pub use file::AppendFileSink;
pub use memory::MemorySink;

/// Destination for flushed batches. Each call is one underlying write.
pub trait FlushSink {
    /// Append `data` in a single write.
    fn append(&mut self, data: &str) -> std::io::Result<()>;

    /// Human readable description used in log output.
    fn describe(&self) -> String;
}

impl<K: FlushSink + ?Sized> FlushSink for &mut K {
    fn append(&mut self, data: &str) -> std::io::Result<()> {
        (**self).append(data)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Separator line framing the comment in the header block.
pub const HEADER_RULE: &str = "* * * *";

/// Build the header block written once at startup.
pub fn header_block(comment: &str, data_header: &str, data_units: &str) -> String {
    format!("\n{HEADER_RULE}\n{comment}\n{HEADER_RULE}\n{data_header}\n{data_units}\n")
}
