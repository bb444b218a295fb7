//! Output sink contract.
//!
//! The crawl engine hands each completed [`BrandRecord`] to a sink exactly
//! once and never looks at it again. Storage format is the sink's business:
//! the CLI writes NDJSON to stdout, tests collect into memory.

use thiserror::Error;

use crate::records::BrandRecord;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives completed brand records, one at a time.
pub trait RecordSink {
    /// Accepts one complete record.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the record cannot be written; the crawl
    /// treats this as fatal since losing emitted data defeats the run.
    fn emit(
        &mut self,
        record: BrandRecord,
    ) -> impl std::future::Future<Output = Result<(), SinkError>>;
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<BrandRecord>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    async fn emit(&mut self, record: BrandRecord) -> Result<(), SinkError> {
        self.records.push(record);
        Ok(())
    }
}
