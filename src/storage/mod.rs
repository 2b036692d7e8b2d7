//! Durable record log and the deduplicating store built on it.
//!
//! The log is an append-only CSV file. [`RecordLog`] covers only the file
//! mechanics; [`RecordStore`] owns the dedup discipline on top of it:
//!
//! ```text
//! nhis_payments.csv
//! Facility Name,Category,District,Amount Paid,Claim Month,Payment Date,Page,Hash
//! Kasoa CHPS,CHPS,Awutu Senya East,2000.25,01/12/2024,03/02/2025,4,Kasoa20002503022025
//! ...
//! ```

pub mod local;
mod store;

use crate::error::Result;
use crate::models::{LogEntry, Record};

// Re-export for convenience
pub use local::CsvRecordLog;
pub use store::{FlushSummary, RecordStore};

/// File mechanics of the persisted record log.
pub trait RecordLog {
    /// Whether the log already exists.
    fn exists(&self) -> bool;

    /// Whether the log exists but holds no bytes, not even a header.
    fn is_empty(&self) -> Result<bool>;

    /// Create the log containing only the column header.
    fn create(&mut self) -> Result<()>;

    /// Read the resume columns of every well-formed row. Malformed rows are
    /// skipped; I/O failures and a header without the resume columns are
    /// errors.
    fn read_entries(&self) -> Result<Vec<LogEntry>>;

    /// Append one row and make it durable before returning.
    fn append(&mut self, record: &Record) -> Result<()>;
}
