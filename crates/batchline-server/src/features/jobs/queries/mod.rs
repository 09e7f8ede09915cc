pub mod get_execution;
pub mod job_info;

pub use get_execution::{ExecutionDetails, GetExecutionError, GetExecutionQuery, StepSummary};
pub use job_info::{JobInfo, JobInfoQuery};
