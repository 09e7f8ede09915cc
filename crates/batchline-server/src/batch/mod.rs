//! Chunk-oriented batch engine
//!
//! Jobs are ordered lists of steps. The launcher checks launch guards
//! through the job repository, runs each step and notifies listeners. The
//! chunk step drives a reader, processor and writer in transactional chunks
//! with a per-step skip budget, and can resume from the last committed
//! position after a failed or stopped execution.

pub mod chunk;
pub mod error;
pub mod item;
pub mod job;
pub mod launcher;
pub mod listener;
pub mod repository;
pub mod step;
pub mod types;

// Re-export commonly used types
pub use chunk::{ChunkConfig, ChunkStep, RecordByRecordWrite, SkipPolicy, WholeChunkWrite, WriteReport, WriteStrategy};
pub use error::{ItemError, JobLaunchError, StopError, WriteError};
pub use item::{ItemProcessor, ItemReader, ItemReaderFactory, ItemWriter};
pub use job::{Job, JobBuilder, ParametersValidator};
pub use launcher::JobLauncher;
pub use listener::{JobExecutionListener, LoggingJobListener};
pub use repository::{InMemoryJobRepository, JobRepository};
pub use step::{Step, StepContext};
pub use types::{
    BatchStatus, ChunkPhase, JobExecution, JobExecutionResult, JobInstance, JobParameterValue,
    JobParameters, StepExecution,
};
