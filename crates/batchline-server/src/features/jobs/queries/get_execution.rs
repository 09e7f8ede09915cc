//! Get execution query
//!
//! Full status of one job execution: parameters, step counters and failure
//! causes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::{BatchStatus, JobExecution, JobParameters, StepExecution};
use crate::features::JobsState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetExecutionQuery {
    pub execution_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    pub step_name: String,
    pub status: BatchStatus,
    pub read_count: u64,
    pub write_count: u64,
    pub filter_count: u64,
    pub skip_count: u64,
    pub read_skip_count: u64,
    pub process_skip_count: u64,
    pub write_skip_count: u64,
    pub commit_count: u64,
    pub rollback_count: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub exit_description: Option<String>,
}

impl From<&StepExecution> for StepSummary {
    fn from(step: &StepExecution) -> Self {
        Self {
            step_name: step.step_name.clone(),
            status: step.status,
            read_count: step.read_count,
            write_count: step.write_count,
            filter_count: step.filter_count,
            skip_count: step.skip_count,
            read_skip_count: step.read_skip_count,
            process_skip_count: step.process_skip_count,
            write_skip_count: step.write_skip_count,
            commit_count: step.commit_count,
            rollback_count: step.rollback_count,
            start_time: step.start_time,
            end_time: step.end_time,
            exit_description: step.exit_description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDetails {
    pub job_execution_id: i64,
    pub job_instance_id: i64,
    pub job_name: String,
    pub status: BatchStatus,
    pub parameters: JobParameters,
    pub create_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub exit_description: Option<String>,
    pub steps: Vec<StepSummary>,
    pub failures: Vec<String>,
}

impl From<&JobExecution> for ExecutionDetails {
    fn from(execution: &JobExecution) -> Self {
        Self {
            job_execution_id: execution.id,
            job_instance_id: execution.instance.id,
            job_name: execution.job_name().to_string(),
            status: execution.status,
            parameters: execution.parameters.clone(),
            create_time: execution.create_time,
            start_time: execution.start_time,
            end_time: execution.end_time,
            exit_description: execution.exit_description.clone(),
            steps: execution.step_executions.iter().map(StepSummary::from).collect(),
            failures: execution.all_failures(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetExecutionError {
    #[error("Job execution {0} not found")]
    NotFound(i64),
}

pub async fn handle(
    state: &JobsState,
    query: GetExecutionQuery,
) -> Result<ExecutionDetails, GetExecutionError> {
    let execution = state
        .launcher
        .repository()
        .get_job_execution(query.execution_id)
        .await
        .ok_or(GetExecutionError::NotFound(query.execution_id))?;

    Ok(ExecutionDetails::from(&execution))
}
