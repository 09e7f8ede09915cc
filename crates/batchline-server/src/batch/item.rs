//! Reader, processor and writer contracts
//!
//! Implement these for any record source, transformation and sink; the
//! chunk step drives them.

use async_trait::async_trait;

use super::error::{ItemError, WriteError};

/// Lazy, ordered sequence of input records
pub trait ItemReader<T>: Send {
    /// Next record, `Ok(None)` at end of input.
    ///
    /// A recoverable error consumes the offending record; reading may
    /// continue afterwards.
    fn read(&mut self) -> Result<Option<T>, ItemError>;

    /// Data records consumed so far, counting malformed ones
    fn position(&self) -> u64;
}

/// Opens a fresh reader for each step execution
pub trait ItemReaderFactory<T>: Send + Sync {
    /// Open the source, skipping the first `start_position` data records.
    ///
    /// An unreachable source is reported as [`ItemError::Fatal`].
    fn open(&self, start_position: u64) -> Result<Box<dyn ItemReader<T>>, ItemError>;
}

/// Pure per-record transformation
///
/// `Ok(None)` filters the record out without counting it as a fault.
pub trait ItemProcessor<I, O>: Send + Sync {
    fn process(&self, item: I) -> Result<Option<O>, ItemError>;
}

/// Transactional sink for one chunk of records
#[async_trait]
pub trait ItemWriter<T: Send + Sync>: Send + Sync {
    /// Called once before the first chunk
    async fn open(&self) -> Result<(), WriteError> {
        Ok(())
    }

    /// Write all items as one unit; on error nothing is persisted.
    async fn write(&self, items: &[T]) -> Result<(), WriteError>;
}
