//! Job repository: instances, executions and the launch guards

use async_trait::async_trait;
use batchline_common::fingerprint::Fingerprint;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::error::JobLaunchError;
use super::types::{BatchStatus, JobExecution, JobInstance, JobParameters, StepExecution};

/// Stores job metadata and enforces launch preconditions atomically
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Create a new execution for `job_name` + `parameters`.
    ///
    /// Fails when an execution of the same instance is still running, when
    /// the instance already completed, or when a restart is not allowed.
    async fn create_job_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
        restartable: bool,
    ) -> Result<JobExecution, JobLaunchError>;

    async fn update_job_execution(&self, execution: &JobExecution);

    async fn get_job_execution(&self, id: i64) -> Option<JobExecution>;

    /// Most recent execution of the instance before `execution`
    async fn previous_execution(&self, execution: &JobExecution) -> Option<JobExecution>;

    /// Latest run of `step_name` in an earlier execution of the same instance
    async fn last_step_execution(
        &self,
        execution: &JobExecution,
        step_name: &str,
    ) -> Option<StepExecution>;

    async fn last_job_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Option<JobExecution>;

    /// All executions of a job, newest first
    async fn job_executions(&self, job_name: &str) -> Vec<JobExecution>;
}

#[derive(Debug, Default)]
struct RepositoryState {
    next_instance_id: i64,
    next_execution_id: i64,
    instances: HashMap<(String, Fingerprint), JobInstance>,
    executions: BTreeMap<i64, JobExecution>,
    executions_by_instance: HashMap<i64, Vec<i64>>,
}

impl RepositoryState {
    fn last_execution_of(&self, instance_id: i64) -> Option<&JobExecution> {
        self.executions_by_instance
            .get(&instance_id)
            .and_then(|ids| ids.last())
            .and_then(|id| self.executions.get(id))
    }
}

/// Process-local job repository
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    state: RwLock<RepositoryState>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create_job_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
        restartable: bool,
    ) -> Result<JobExecution, JobLaunchError> {
        let mut state = self.state.write().await;
        let key = (job_name.to_string(), parameters.instance_key());

        let existing = state.instances.get(&key).cloned();
        let instance = match existing {
            Some(instance) => {
                if let Some(last) = state.last_execution_of(instance.id) {
                    if last.status.is_running() {
                        return Err(JobLaunchError::AlreadyRunning {
                            job_name: job_name.to_string(),
                            execution_id: last.id,
                        });
                    }
                    if last.status == BatchStatus::Completed {
                        return Err(JobLaunchError::AlreadyComplete {
                            job_name: job_name.to_string(),
                            parameters: parameters.to_string(),
                        });
                    }
                    if !restartable {
                        return Err(JobLaunchError::RestartNotPermitted {
                            job_name: job_name.to_string(),
                            reason: format!(
                                "job is not restartable and execution {} ended {}",
                                last.id, last.status
                            ),
                        });
                    }
                }
                instance
            },
            None => {
                state.next_instance_id += 1;
                let instance = JobInstance {
                    id: state.next_instance_id,
                    job_name: job_name.to_string(),
                    job_key: key.1.clone(),
                };
                state.instances.insert(key, instance.clone());
                instance
            },
        };

        state.next_execution_id += 1;
        let execution = JobExecution::new(state.next_execution_id, instance, parameters.clone());
        state
            .executions_by_instance
            .entry(execution.instance.id)
            .or_default()
            .push(execution.id);
        state.executions.insert(execution.id, execution.clone());

        Ok(execution)
    }

    async fn update_job_execution(&self, execution: &JobExecution) {
        let mut state = self.state.write().await;
        state.executions.insert(execution.id, execution.clone());
    }

    async fn get_job_execution(&self, id: i64) -> Option<JobExecution> {
        self.state.read().await.executions.get(&id).cloned()
    }

    async fn previous_execution(&self, execution: &JobExecution) -> Option<JobExecution> {
        let state = self.state.read().await;
        state
            .executions_by_instance
            .get(&execution.instance.id)?
            .iter()
            .rev()
            .find(|id| **id < execution.id)
            .and_then(|id| state.executions.get(id))
            .cloned()
    }

    async fn last_step_execution(
        &self,
        execution: &JobExecution,
        step_name: &str,
    ) -> Option<StepExecution> {
        let state = self.state.read().await;
        state
            .executions_by_instance
            .get(&execution.instance.id)?
            .iter()
            .rev()
            .filter(|id| **id < execution.id)
            .filter_map(|id| state.executions.get(id))
            .find_map(|e| e.step(step_name))
            .cloned()
    }

    async fn last_job_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Option<JobExecution> {
        let state = self.state.read().await;
        let instance = state
            .instances
            .get(&(job_name.to_string(), parameters.instance_key()))?;
        state.last_execution_of(instance.id).cloned()
    }

    async fn job_executions(&self, job_name: &str) -> Vec<JobExecution> {
        let state = self.state.read().await;
        state
            .executions
            .values()
            .rev()
            .filter(|e| e.job_name() == job_name)
            .cloned()
            .collect()
    }
}
