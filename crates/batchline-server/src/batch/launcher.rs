//! Job launcher: runs job executions and handles stop requests

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use super::error::{JobLaunchError, StopError};
use super::job::Job;
use super::repository::JobRepository;
use super::step::StepContext;
use super::types::{BatchStatus, JobExecution, JobParameters, StepExecution};

/// Runs jobs to completion and tracks the executions currently in flight
///
/// Each launch runs on its own task. A caller that stops waiting (a dropped
/// request, a timeout) leaves the execution running to a terminal status.
pub struct JobLauncher {
    inner: Arc<LauncherState>,
}

struct LauncherState {
    repository: Arc<dyn JobRepository>,
    running: Mutex<HashMap<i64, CancellationToken>>,
}

impl JobLauncher {
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self {
            inner: Arc::new(LauncherState {
                repository,
                running: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn repository(&self) -> &Arc<dyn JobRepository> {
        &self.inner.repository
    }

    /// Run `job` with `parameters` to completion.
    ///
    /// Launch guards are checked before the execution enters STARTED; once
    /// running, every outcome (including failure) is reported through the
    /// returned execution's status.
    pub async fn run(
        &self,
        job: &Job,
        parameters: JobParameters,
    ) -> Result<JobExecution, JobLaunchError> {
        job.validator().validate(&parameters)?;

        let state = Arc::clone(&self.inner);
        let job = job.clone();
        tokio::spawn(async move { state.launch(&job, parameters).await })
            .await
            .map_err(|e| JobLaunchError::Interrupted(e.to_string()))?
    }

    /// Ask a running execution to stop at its next chunk boundary
    pub async fn stop(&self, execution_id: i64) -> Result<JobExecution, StopError> {
        let mut execution = self
            .inner
            .repository
            .get_job_execution(execution_id)
            .await
            .ok_or(StopError::NotFound(execution_id))?;

        let running = self.inner.running.lock().await;
        let Some(token) = running.get(&execution_id) else {
            return Err(StopError::NotRunning {
                id: execution_id,
                status: execution.status,
            });
        };

        token.cancel();
        if execution.status.is_running() {
            execution.status = BatchStatus::Stopping;
            self.inner.repository.update_job_execution(&execution).await;
        }
        warn!(job_execution_id = execution_id, "Stop requested");

        Ok(execution)
    }

    /// Ids of executions currently running in this process
    pub async fn running_executions(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.inner.running.lock().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl LauncherState {
    async fn launch(&self, job: &Job, parameters: JobParameters) -> Result<JobExecution, JobLaunchError> {
        let mut execution = self
            .repository
            .create_job_execution(job.name(), &parameters, job.is_restartable())
            .await?;

        let span = info_span!(
            "job",
            job = %job.name(),
            job_execution_id = execution.id,
            job_instance_id = execution.instance.id
        );

        async {
            let stop = CancellationToken::new();
            self.running.lock().await.insert(execution.id, stop.clone());

            execution.status = BatchStatus::Started;
            execution.start_time = Some(Utc::now());
            self.repository.update_job_execution(&execution).await;

            for listener in job.listeners() {
                listener.before_job(&execution);
            }

            let status = self.run_steps(job, &mut execution, &stop).await;

            execution.status = status;
            execution.end_time = Some(Utc::now());
            execution.exit_description = match status {
                BatchStatus::Completed => None,
                _ => execution
                    .step_executions
                    .iter()
                    .rev()
                    .find_map(|s| s.exit_description.clone()),
            };

            self.running.lock().await.remove(&execution.id);
            self.repository.update_job_execution(&execution).await;

            for listener in job.listeners() {
                listener.after_job(&execution);
            }

            info!(status = %execution.status, "Job execution finished");
        }
        .instrument(span)
        .await;

        Ok(execution)
    }

    async fn run_steps(
        &self,
        job: &Job,
        execution: &mut JobExecution,
        stop: &CancellationToken,
    ) -> BatchStatus {
        for step in job.steps() {
            if stop.is_cancelled() {
                return BatchStatus::Stopped;
            }

            let prior = self
                .repository
                .last_step_execution(execution, step.name())
                .await;
            if let Some(prior) = prior.as_ref().filter(|s| s.status == BatchStatus::Completed) {
                info!(
                    step = %step.name(),
                    previous_execution_id = prior.job_execution_id,
                    "Step already completed, not re-running"
                );
                continue;
            }
            let restart_position = prior.as_ref().map(|s| s.committed_position).unwrap_or(0);

            let mut step_execution = StepExecution::new(step.name(), execution.id);
            step.execute(
                &mut step_execution,
                &StepContext::new(restart_position, stop.clone()),
            )
            .await;

            let status = step_execution.status;
            execution.step_executions.push(step_execution);
            if stop.is_cancelled() && execution.status == BatchStatus::Started {
                execution.status = BatchStatus::Stopping;
            }
            self.repository.update_job_execution(execution).await;

            match status {
                BatchStatus::Completed => continue,
                BatchStatus::Stopped => return BatchStatus::Stopped,
                _ => return BatchStatus::Failed,
            }
        }

        BatchStatus::Completed
    }
}
