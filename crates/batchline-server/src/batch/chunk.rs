//! Chunk-oriented step
//!
//! Reads up to `chunk_size` records, processes them one by one and writes the
//! survivors as a single transaction. A rejected chunk is rolled back and
//! replayed record by record so only the offending records are skipped.
//! Recoverable faults in any phase draw from one skip budget per step
//! execution; fatal faults fail the step immediately.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::error::{ItemError, WriteError};
use super::item::{ItemProcessor, ItemReader, ItemReaderFactory, ItemWriter};
use super::step::{Step, StepContext};
use super::types::{BatchStatus, ChunkPhase, StepExecution};

/// Default number of records per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Default number of recoverable faults tolerated per step execution.
pub const DEFAULT_SKIP_LIMIT: u64 = 10;

/// Chunk sizing and fault tolerance for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub skip_limit: u64,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, skip_limit: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            skip_limit,
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_SKIP_LIMIT)
    }
}

/// Skip budget: faults 1..=limit are tolerated, the next one is not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipPolicy {
    limit: u64,
}

impl SkipPolicy {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Whether a step that has now skipped `skip_count` records may go on
    pub fn allows(&self, skip_count: u64) -> bool {
        skip_count <= self.limit
    }
}

// ============================================================================
// Write Strategies
// ============================================================================

/// Outcome of handing a chunk to a write strategy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    /// Index and cause of each record refused individually, in input order
    pub rejected: Vec<(usize, String)>,
    /// Index of the record whose write hit an outage, and its cause
    pub interrupted: Option<(usize, String)>,
}

/// How a chunk is handed to the writer
///
/// A strategy that writes records separately must stop once more than
/// `max_rejections` of them have been refused.
#[async_trait]
pub trait WriteStrategy<T: Send + Sync>: Send + Sync {
    async fn write(
        &self,
        writer: &dyn ItemWriter<T>,
        items: &[T],
        max_rejections: u64,
    ) -> Result<WriteReport, WriteError>;
}

/// One transaction for the whole chunk
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeChunkWrite;

#[async_trait]
impl<T: Send + Sync> WriteStrategy<T> for WholeChunkWrite {
    async fn write(
        &self,
        writer: &dyn ItemWriter<T>,
        items: &[T],
        _max_rejections: u64,
    ) -> Result<WriteReport, WriteError> {
        writer.write(items).await?;
        Ok(WriteReport {
            written: items.len(),
            ..WriteReport::default()
        })
    }
}

/// One transaction per record, used to isolate the records that broke a chunk
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordByRecordWrite;

#[async_trait]
impl<T: Send + Sync> WriteStrategy<T> for RecordByRecordWrite {
    async fn write(
        &self,
        writer: &dyn ItemWriter<T>,
        items: &[T],
        max_rejections: u64,
    ) -> Result<WriteReport, WriteError> {
        let mut report = WriteReport::default();
        for (index, item) in items.iter().enumerate() {
            match writer.write(std::slice::from_ref(item)).await {
                Ok(()) => report.written += 1,
                Err(WriteError::Rejected(cause)) => {
                    report.rejected.push((index, cause));
                    if report.rejected.len() as u64 > max_rejections {
                        break;
                    }
                },
                Err(WriteError::Unavailable(cause)) => {
                    report.interrupted = Some((index, cause));
                    break;
                },
            }
        }
        Ok(report)
    }
}

/// Items of one chunk with the reader position each one started at
struct Chunk<T> {
    items: Vec<T>,
    starts: Vec<u64>,
}

// ============================================================================
// Chunk Step
// ============================================================================

#[derive(Debug, Error)]
enum StepAbort {
    #[error("Fatal {phase} fault: {message}")]
    Fatal { phase: ChunkPhase, message: String },

    #[error("Skip limit of {limit} exceeded; last {phase} fault: {cause}")]
    SkipLimitExceeded {
        limit: u64,
        phase: ChunkPhase,
        cause: String,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

enum LoopEnd {
    Exhausted,
    StopRequested,
}

/// Step that runs the read/process/write cycle chunk by chunk
pub struct ChunkStep<I, O: Send + Sync> {
    name: String,
    config: ChunkConfig,
    reader: Arc<dyn ItemReaderFactory<I>>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ItemWriter<O>>,
    chunk_strategy: Box<dyn WriteStrategy<O>>,
    isolation_strategy: Box<dyn WriteStrategy<O>>,
}

impl<I, O> ChunkStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<String>,
        config: ChunkConfig,
        reader: Arc<dyn ItemReaderFactory<I>>,
        processor: Arc<dyn ItemProcessor<I, O>>,
        writer: Arc<dyn ItemWriter<O>>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            reader,
            processor,
            writer,
            chunk_strategy: Box::new(WholeChunkWrite),
            isolation_strategy: Box::new(RecordByRecordWrite),
        }
    }

    /// Replace the strategies used for whole chunks and for isolation retries
    pub fn with_write_strategies(
        mut self,
        chunk: Box<dyn WriteStrategy<O>>,
        isolation: Box<dyn WriteStrategy<O>>,
    ) -> Self {
        self.chunk_strategy = chunk;
        self.isolation_strategy = isolation;
        self
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    async fn run_chunks(
        &self,
        execution: &mut StepExecution,
        context: &StepContext,
    ) -> Result<LoopEnd, StepAbort> {
        execution.committed_position = context.restart_position;

        let mut reader = self
            .reader
            .open(context.restart_position)
            .map_err(|e| StepAbort::Fatal {
                phase: ChunkPhase::Read,
                message: format!("cannot open source: {}", e),
            })?;

        self.writer.open().await.map_err(|e| match e {
            WriteError::Unavailable(cause) => StepAbort::StoreUnavailable(cause),
            WriteError::Rejected(cause) => StepAbort::Fatal {
                phase: ChunkPhase::Write,
                message: cause,
            },
        })?;

        let policy = SkipPolicy::new(self.config.skip_limit);

        loop {
            if context.stop_requested() {
                info!(
                    committed_position = execution.committed_position,
                    "Stop requested, ending step at chunk boundary"
                );
                return Ok(LoopEnd::StopRequested);
            }

            let (chunk, exhausted) = self.read_chunk(reader.as_mut(), execution, &policy)?;
            let outputs = self.process_chunk(chunk, execution, &policy)?;
            self.write_chunk(&outputs, execution, &policy).await?;

            execution.committed_position = reader.position();
            execution.commit_count += 1;
            debug!(
                written = outputs.items.len(),
                committed_position = execution.committed_position,
                commit_count = execution.commit_count,
                "Chunk committed"
            );

            if exhausted {
                return Ok(LoopEnd::Exhausted);
            }
        }
    }

    /// Fill one chunk; read faults do not occupy a slot.
    fn read_chunk(
        &self,
        reader: &mut dyn ItemReader<I>,
        execution: &mut StepExecution,
        policy: &SkipPolicy,
    ) -> Result<(Chunk<I>, bool), StepAbort> {
        let mut chunk = Chunk {
            items: Vec::with_capacity(self.config.chunk_size),
            starts: Vec::with_capacity(self.config.chunk_size),
        };
        while chunk.items.len() < self.config.chunk_size {
            let start = reader.position();
            match reader.read() {
                Ok(Some(item)) => {
                    execution.read_count += 1;
                    chunk.items.push(item);
                    chunk.starts.push(start);
                },
                Ok(None) => return Ok((chunk, true)),
                Err(e) => on_fault(execution, policy, ChunkPhase::Read, e)?,
            }
        }
        Ok((chunk, false))
    }

    fn process_chunk(
        &self,
        chunk: Chunk<I>,
        execution: &mut StepExecution,
        policy: &SkipPolicy,
    ) -> Result<Chunk<O>, StepAbort> {
        let mut outputs = Chunk {
            items: Vec::with_capacity(chunk.items.len()),
            starts: Vec::with_capacity(chunk.items.len()),
        };
        for (item, start) in chunk.items.into_iter().zip(chunk.starts) {
            match self.processor.process(item) {
                Ok(Some(output)) => {
                    outputs.items.push(output);
                    outputs.starts.push(start);
                },
                Ok(None) => execution.filter_count += 1,
                Err(e) => on_fault(execution, policy, ChunkPhase::Process, e)?,
            }
        }
        Ok(outputs)
    }

    /// Write one chunk, isolating failing records if it is rejected.
    ///
    /// When isolation ends the step early, `committed_position` moves to the
    /// start of the record that ended it.
    async fn write_chunk(
        &self,
        chunk: &Chunk<O>,
        execution: &mut StepExecution,
        policy: &SkipPolicy,
    ) -> Result<(), StepAbort> {
        let items = chunk.items.as_slice();
        if items.is_empty() {
            return Ok(());
        }

        let tolerated = policy.limit().saturating_sub(execution.skip_count);
        let cause = match self
            .chunk_strategy
            .write(self.writer.as_ref(), items, tolerated)
            .await
        {
            Ok(report) => {
                execution.write_count += report.written as u64;
                return Ok(());
            },
            Err(WriteError::Unavailable(cause)) => return Err(StepAbort::StoreUnavailable(cause)),
            Err(WriteError::Rejected(cause)) => cause,
        };

        execution.rollback_count += 1;
        warn!(
            chunk_size = items.len(),
            cause = %cause,
            "Chunk write rolled back, isolating failing records"
        );

        let report = self
            .isolation_strategy
            .write(self.writer.as_ref(), items, tolerated)
            .await
            .map_err(|e| match e {
                WriteError::Unavailable(cause) => StepAbort::StoreUnavailable(cause),
                WriteError::Rejected(cause) => StepAbort::Fatal {
                    phase: ChunkPhase::Write,
                    message: cause,
                },
            })?;

        execution.write_count += report.written as u64;
        for (index, cause) in report.rejected {
            if let Err(abort) = on_fault(execution, policy, ChunkPhase::Write, ItemError::Recoverable(cause)) {
                if let Some(&start) = chunk.starts.get(index) {
                    execution.committed_position = start;
                }
                return Err(abort);
            }
        }
        if let Some((index, cause)) = report.interrupted {
            if let Some(&start) = chunk.starts.get(index) {
                execution.committed_position = start;
            }
            return Err(StepAbort::StoreUnavailable(cause));
        }
        Ok(())
    }
}

fn on_fault(
    execution: &mut StepExecution,
    policy: &SkipPolicy,
    phase: ChunkPhase,
    error: ItemError,
) -> Result<(), StepAbort> {
    match error {
        ItemError::Fatal(message) => Err(StepAbort::Fatal { phase, message }),
        ItemError::Recoverable(cause) => {
            execution.record_skip(phase);
            if !policy.allows(execution.skip_count) {
                return Err(StepAbort::SkipLimitExceeded {
                    limit: policy.limit(),
                    phase,
                    cause,
                });
            }
            warn!(
                phase = %phase,
                skip_count = execution.skip_count,
                cause = %cause,
                "Skipping record"
            );
            Ok(())
        },
    }
}

#[async_trait]
impl<I, O> Step for ChunkStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, execution: &mut StepExecution, context: &StepContext) {
        let span = info_span!(
            "step",
            step = %self.name,
            job_execution_id = execution.job_execution_id
        );

        async {
            execution.status = BatchStatus::Started;
            info!(
                restart_position = context.restart_position,
                chunk_size = self.config.chunk_size,
                skip_limit = self.config.skip_limit,
                "Step started"
            );

            match self.run_chunks(execution, context).await {
                Ok(LoopEnd::Exhausted) => {
                    execution.finish(BatchStatus::Completed, None);
                    info!(
                        read = execution.read_count,
                        written = execution.write_count,
                        filtered = execution.filter_count,
                        skipped = execution.skip_count,
                        "Step completed"
                    );
                },
                Ok(LoopEnd::StopRequested) => {
                    execution.finish(BatchStatus::Stopped, Some("Stop requested".to_string()));
                    info!(written = execution.write_count, "Step stopped");
                },
                Err(abort) => {
                    let message = abort.to_string();
                    error!(error = %message, "Step failed");
                    execution.failures.push(message.clone());
                    execution.finish(BatchStatus::Failed, Some(message));
                },
            }
        }
        .instrument(span)
        .await
    }
}
