//! Job lifecycle observers

use tracing::{error, info, warn};

use super::types::{BatchStatus, JobExecution};

/// Observer notified once before and once after every job execution
///
/// Listeners get a shared reference and cannot change the outcome.
pub trait JobExecutionListener: Send + Sync {
    fn before_job(&self, _execution: &JobExecution) {}

    fn after_job(&self, _execution: &JobExecution) {}
}

/// Logs job start, final status, step counters and failure causes
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingJobListener;

impl JobExecutionListener for LoggingJobListener {
    fn before_job(&self, execution: &JobExecution) {
        info!(
            job = %execution.job_name(),
            job_instance_id = execution.instance.id,
            job_execution_id = execution.id,
            parameters = %execution.parameters,
            "Job starting"
        );
    }

    fn after_job(&self, execution: &JobExecution) {
        let duration_ms = match (execution.start_time, execution.end_time) {
            (Some(start), Some(end)) => (end - start).num_milliseconds(),
            _ => 0,
        };

        info!(
            job = %execution.job_name(),
            job_execution_id = execution.id,
            status = %execution.status,
            exit_description = execution.exit_description.as_deref().unwrap_or(""),
            start_time = ?execution.start_time,
            end_time = ?execution.end_time,
            duration_ms,
            "Job finished"
        );

        for step in &execution.step_executions {
            info!(
                step = %step.step_name,
                status = %step.status,
                read = step.read_count,
                written = step.write_count,
                filtered = step.filter_count,
                skipped = step.skip_count,
                commits = step.commit_count,
                rollbacks = step.rollback_count,
                "Step summary"
            );
        }

        match execution.status {
            BatchStatus::Completed => {},
            BatchStatus::Stopped => warn!(job_execution_id = execution.id, "Job was stopped"),
            _ => {
                for failure in execution.all_failures() {
                    error!(job_execution_id = execution.id, failure = %failure, "Job failure");
                }
            },
        }
    }
}
