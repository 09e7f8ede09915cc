//! Core types for the chunk-oriented batch engine
//!
//! Job parameters, instances, executions and the per-step summaries the
//! engine fills in while it runs.

use batchline_common::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status shared by job and step executions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Starting,
    Started,
    Stopping,
    Completed,
    Failed,
    Stopped,
}

impl BatchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BatchStatus::Starting => "STARTING",
            BatchStatus::Started => "STARTED",
            BatchStatus::Stopping => "STOPPING",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
            BatchStatus::Stopped => "STOPPED",
        }
    }

    /// COMPLETED, FAILED and STOPPED never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Stopped)
    }

    pub fn is_running(&self) -> bool {
        !self.is_terminal()
    }

    /// Terminal states from which the same instance may be restarted.
    pub fn is_restartable(&self) -> bool {
        matches!(self, BatchStatus::Failed | BatchStatus::Stopped)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Job Parameters
// ============================================================================

/// A single typed job parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum JobParameterValue {
    String(String),
    Long(i64),
    DateTime(DateTime<Utc>),
}

impl fmt::Display for JobParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobParameterValue::String(s) => f.write_str(s),
            JobParameterValue::Long(n) => write!(f, "{}", n),
            JobParameterValue::DateTime(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

/// Named parameters identifying a job instance
///
/// Keys are kept sorted so the derived instance key does not depend on
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobParameters {
    values: BTreeMap<String, JobParameterValue>,
}

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> JobParametersBuilder {
        JobParametersBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&JobParameterValue> {
        self.values.get(key)
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(JobParameterValue::Long(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(JobParameterValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stable key identifying the job instance these parameters select
    pub fn instance_key(&self) -> Fingerprint {
        Fingerprint::of_pairs(self.values.iter().map(|(k, v)| (k.as_str(), v.to_string())))
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Default)]
pub struct JobParametersBuilder {
    values: BTreeMap<String, JobParameterValue>,
}

impl JobParametersBuilder {
    pub fn add_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), JobParameterValue::String(value.into()));
        self
    }

    pub fn add_long(mut self, key: impl Into<String>, value: i64) -> Self {
        self.values.insert(key.into(), JobParameterValue::Long(value));
        self
    }

    pub fn add_date_time(mut self, key: impl Into<String>, value: DateTime<Utc>) -> Self {
        self.values.insert(key.into(), JobParameterValue::DateTime(value));
        self
    }

    pub fn build(self) -> JobParameters {
        JobParameters { values: self.values }
    }
}

// ============================================================================
// Instances and Executions
// ============================================================================

/// A job abstracted over one parameter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInstance {
    pub id: i64,
    pub job_name: String,
    pub job_key: Fingerprint,
}

/// Counters and outcome of one step run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecution {
    pub step_name: String,
    pub job_execution_id: i64,
    pub status: BatchStatus,
    pub read_count: u64,
    pub write_count: u64,
    pub filter_count: u64,
    pub read_skip_count: u64,
    pub process_skip_count: u64,
    pub write_skip_count: u64,
    pub skip_count: u64,
    pub commit_count: u64,
    pub rollback_count: u64,
    /// Data records consumed by the reader at the last successful commit
    pub committed_position: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub exit_description: Option<String>,
    pub failures: Vec<String>,
}

impl StepExecution {
    pub fn new(step_name: impl Into<String>, job_execution_id: i64) -> Self {
        Self {
            step_name: step_name.into(),
            job_execution_id,
            status: BatchStatus::Starting,
            read_count: 0,
            write_count: 0,
            filter_count: 0,
            read_skip_count: 0,
            process_skip_count: 0,
            write_skip_count: 0,
            skip_count: 0,
            commit_count: 0,
            rollback_count: 0,
            committed_position: 0,
            start_time: Utc::now(),
            end_time: None,
            exit_description: None,
            failures: Vec::new(),
        }
    }

    pub(crate) fn record_skip(&mut self, phase: ChunkPhase) {
        match phase {
            ChunkPhase::Read => self.read_skip_count += 1,
            ChunkPhase::Process => self.process_skip_count += 1,
            ChunkPhase::Write => self.write_skip_count += 1,
        }
        self.skip_count += 1;
    }

    pub(crate) fn finish(&mut self, status: BatchStatus, description: Option<String>) {
        self.status = status;
        self.exit_description = description;
        self.end_time = Some(Utc::now());
    }
}

/// Phase of the chunk cycle a fault was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPhase {
    Read,
    Process,
    Write,
}

impl fmt::Display for ChunkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkPhase::Read => f.write_str("read"),
            ChunkPhase::Process => f.write_str("process"),
            ChunkPhase::Write => f.write_str("write"),
        }
    }
}

/// One concrete run of a job instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: i64,
    pub instance: JobInstance,
    pub parameters: JobParameters,
    pub status: BatchStatus,
    pub create_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub exit_description: Option<String>,
    pub step_executions: Vec<StepExecution>,
    pub failures: Vec<String>,
}

impl JobExecution {
    pub fn new(id: i64, instance: JobInstance, parameters: JobParameters) -> Self {
        Self {
            id,
            instance,
            parameters,
            status: BatchStatus::Starting,
            create_time: Utc::now(),
            start_time: None,
            end_time: None,
            exit_description: None,
            step_executions: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.instance.job_name
    }

    pub fn step(&self, name: &str) -> Option<&StepExecution> {
        self.step_executions.iter().find(|s| s.step_name == name)
    }

    /// Job-level failures followed by every step's failures
    pub fn all_failures(&self) -> Vec<String> {
        self.failures
            .iter()
            .chain(self.step_executions.iter().flat_map(|s| s.failures.iter()))
            .cloned()
            .collect()
    }

    pub fn result(&self) -> JobExecutionResult {
        JobExecutionResult {
            job_execution_id: self.id,
            job_instance_id: self.instance.id,
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Outcome summary returned to whoever launched a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecutionResult {
    pub job_execution_id: i64,
    pub job_instance_id: i64,
    pub status: BatchStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&BatchStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        assert_eq!(BatchStatus::Stopping.to_string(), "STOPPING");
    }

    #[test]
    fn test_status_terminal_states() {
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Failed.is_terminal());
        assert!(BatchStatus::Stopped.is_terminal());
        assert!(BatchStatus::Starting.is_running());
        assert!(BatchStatus::Stopping.is_running());
        assert!(!BatchStatus::Completed.is_restartable());
        assert!(BatchStatus::Stopped.is_restartable());
    }

    #[test]
    fn test_parameters_display_sorted() {
        let params = JobParameters::builder()
            .add_string("source", "persons.csv")
            .add_long("timestamp", 42)
            .build();
        assert_eq!(params.to_string(), "{source=persons.csv, timestamp=42}");
        assert_eq!(params.get_long("timestamp"), Some(42));
        assert_eq!(params.get_string("source"), Some("persons.csv"));
        assert_eq!(params.get_long("source"), None);
    }

    #[test]
    fn test_instance_key_ignores_insertion_order() {
        let a = JobParameters::builder().add_long("a", 1).add_long("b", 2).build();
        let b = JobParameters::builder().add_long("b", 2).add_long("a", 1).build();
        assert_eq!(a.instance_key(), b.instance_key());

        let c = JobParameters::builder().add_long("a", 1).add_long("b", 3).build();
        assert_ne!(a.instance_key(), c.instance_key());
    }

    #[test]
    fn test_step_skip_accounting() {
        let mut step = StepExecution::new("importPersonsStep", 1);
        step.record_skip(ChunkPhase::Read);
        step.record_skip(ChunkPhase::Process);
        step.record_skip(ChunkPhase::Process);
        step.record_skip(ChunkPhase::Write);
        assert_eq!(step.read_skip_count, 1);
        assert_eq!(step.process_skip_count, 2);
        assert_eq!(step.write_skip_count, 1);
        assert_eq!(step.skip_count, 4);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let instance = JobInstance {
            id: 7,
            job_name: "importPersonsJob".to_string(),
            job_key: JobParameters::new().instance_key(),
        };
        let execution = JobExecution::new(3, instance, JobParameters::new());
        let value = serde_json::to_value(execution.result()).unwrap();
        assert_eq!(value["jobExecutionId"], 3);
        assert_eq!(value["jobInstanceId"], 7);
        assert_eq!(value["status"], "STARTING");
    }
}
