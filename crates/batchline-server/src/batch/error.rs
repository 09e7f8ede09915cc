//! Error taxonomy of the batch engine

use thiserror::Error;

/// Fault raised while reading or processing a single record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// The record is bad; skip it and count it against the skip budget.
    #[error("{0}")]
    Recoverable(String),

    /// The step cannot continue.
    #[error("{0}")]
    Fatal(String),
}

impl ItemError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        ItemError::Recoverable(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        ItemError::Fatal(message.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ItemError::Fatal(_))
    }
}

/// Failure of a transactional chunk write
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    /// The store refused the data; the transaction was rolled back.
    #[error("write rejected: {0}")]
    Rejected(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Reasons a job cannot be launched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobLaunchError {
    #[error("A job execution for this job is already running: job={job_name}, execution={execution_id}")]
    AlreadyRunning { job_name: String, execution_id: i64 },

    #[error(
        "A job instance already exists and is complete for parameters={parameters}. \
         If you want to run this job again, change the parameters."
    )]
    AlreadyComplete { job_name: String, parameters: String },

    #[error("Invalid job parameters: {0}")]
    InvalidParameters(String),

    #[error("Restart not permitted for job {job_name}: {reason}")]
    RestartNotPermitted { job_name: String, reason: String },

    /// The task running the execution ended without reporting back.
    #[error("Job execution task did not finish: {0}")]
    Interrupted(String),
}

impl JobLaunchError {
    /// Machine-readable code used in API error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            JobLaunchError::AlreadyRunning { .. } => "JOB_ALREADY_RUNNING",
            JobLaunchError::AlreadyComplete { .. } => "JOB_ALREADY_COMPLETE",
            JobLaunchError::InvalidParameters(_) => "INVALID_JOB_PARAMETERS",
            JobLaunchError::RestartNotPermitted { .. } => "JOB_RESTART_NOT_PERMITTED",
            JobLaunchError::Interrupted(_) => "JOB_INTERRUPTED",
        }
    }
}

/// Reasons a stop request cannot be honored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopError {
    #[error("Job execution {0} not found")]
    NotFound(i64),

    #[error("Job execution {id} is not running (status {status})")]
    NotRunning { id: i64, status: super::types::BatchStatus },
}
