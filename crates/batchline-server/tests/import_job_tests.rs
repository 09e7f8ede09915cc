//! End-to-end tests of the person import job against the in-memory store
//!
//! Coverage includes:
//! - Filtering, email derivation and counters
//! - Skip budget boundaries
//! - Chunk isolation after a rejected chunk
//! - Duplicate launch guard
//! - Restart from the last committed position
//! - Stop at a chunk boundary

use std::sync::Arc;

use batchline_server::batch::{
    BatchStatus, InMemoryJobRepository, Job, JobExecution, JobLaunchError, JobLauncher, JobParameters,
    StepExecution,
};
use batchline_server::config::ImportConfig;
use batchline_server::persons::{fresh_parameters, import_persons_job, Person, IMPORT_PERSONS_STEP};
use batchline_server::store::{InMemoryPersonStore, PersonStore};

mod helpers;

use helpers::{csv_file, import_job_with_writer, numbered_rows, FlakyWriter, GateWriter, HEADER};

// ============================================================================
// Helper Functions
// ============================================================================

fn launcher() -> JobLauncher {
    JobLauncher::new(Arc::new(InMemoryJobRepository::new()))
}

fn config(input: &tempfile::NamedTempFile, chunk_size: usize, skip_limit: u64) -> ImportConfig {
    ImportConfig {
        input_path: input.path().to_path_buf(),
        chunk_size,
        skip_limit,
        ..ImportConfig::default()
    }
}

fn step(execution: &JobExecution) -> &StepExecution {
    execution.step(IMPORT_PERSONS_STEP).unwrap()
}

fn params(timestamp: i64) -> JobParameters {
    JobParameters::builder().add_long("timestamp", timestamp).build()
}

async fn emails(store: &InMemoryPersonStore) -> Vec<String> {
    let mut emails: Vec<String> = store.all().await.into_iter().filter_map(|p| p.email).collect();
    emails.sort();
    emails
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_import_filters_incomplete_rows() {
    let input = csv_file("firstName,lastName\nJohn,Doe\n,Smith\nJane,Roe\n");
    let store = Arc::new(InMemoryPersonStore::new());
    let job = import_persons_job(&config(&input, 10, 10), store.clone());

    let execution = launcher().run(&job, fresh_parameters()).await.unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    let step = step(&execution);
    assert_eq!(step.read_count, 3);
    assert_eq!(step.write_count, 2);
    assert_eq!(step.filter_count, 1);
    assert_eq!(step.skip_count, 0);
    assert_eq!(step.commit_count, 1);
    assert_eq!(
        emails(&store).await,
        vec!["jane.roe@example.com".to_string(), "john.doe@example.com".to_string()]
    );
}

#[tokio::test]
async fn test_header_only_file_completes_with_nothing_written() {
    let input = csv_file(HEADER);
    let store = Arc::new(InMemoryPersonStore::new());
    let job = import_persons_job(&config(&input, 10, 10), store.clone());

    let execution = launcher().run(&job, fresh_parameters()).await.unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(step(&execution).read_count, 0);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_every_data_line_is_accounted_for() {
    let content = format!(
        "{}Ann,Lee\nBad Name,X\n,Nobody\nshort\nBo,Ek\nC@t,Dog\nDee,\nEve,Ng\n",
        HEADER
    );
    let data_lines = content.lines().count() as u64 - 1;
    let input = csv_file(&content);
    let store = Arc::new(InMemoryPersonStore::new());
    let job = import_persons_job(&config(&input, 3, 10), store.clone());

    let execution = launcher().run(&job, fresh_parameters()).await.unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    let step = step(&execution);
    assert_eq!(step.write_count + step.skip_count + step.filter_count, data_lines);
    assert_eq!(step.write_count, 3);
    assert_eq!(step.filter_count, 2);
    assert_eq!(step.read_skip_count, 1);
    assert_eq!(step.process_skip_count, 2);
}

#[tokio::test]
async fn test_blank_lines_are_filtered_and_counted() {
    let content = "firstName,lastName\nJohn,Doe\n\nJane,Roe\n";
    let input = csv_file(content);
    let store = Arc::new(InMemoryPersonStore::new());
    let job = import_persons_job(&config(&input, 10, 10), store.clone());

    let execution = launcher().run(&job, fresh_parameters()).await.unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    let step = step(&execution);
    assert_eq!(step.read_count, 3);
    assert_eq!(step.write_count, 2);
    assert_eq!(step.filter_count, 1);
    assert_eq!(step.write_count + step.skip_count + step.filter_count, 3);
    assert_eq!(step.committed_position, 3);
}

// ============================================================================
// Skip Budget
// ============================================================================

fn bad_rows(count: usize) -> String {
    let mut content = HEADER.to_string();
    content.push_str("Good,Person\n");
    for i in 0..count {
        content.push_str(&format!("bad{}@x,Row\n", i));
    }
    content
}

#[tokio::test]
async fn test_skip_limit_tolerates_exactly_k_faults() {
    let input = csv_file(&bad_rows(10));
    let job = import_persons_job(&config(&input, 10, 10), Arc::new(InMemoryPersonStore::new()));

    let execution = launcher().run(&job, fresh_parameters()).await.unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(step(&execution).process_skip_count, 10);
    assert_eq!(step(&execution).write_count, 1);
}

#[tokio::test]
async fn test_fault_past_skip_limit_fails_the_job() {
    let input = csv_file(&bad_rows(11));
    let job = import_persons_job(&config(&input, 10, 10), Arc::new(InMemoryPersonStore::new()));

    let execution = launcher().run(&job, fresh_parameters()).await.unwrap();

    assert_eq!(execution.status, BatchStatus::Failed);
    assert_eq!(step(&execution).skip_count, 11);
    assert!(!execution.all_failures().is_empty());
    assert!(execution.exit_description.is_some());
}

// ============================================================================
// Chunk Isolation
// ============================================================================

#[tokio::test]
async fn test_rejected_chunk_is_retried_record_by_record() {
    let store = Arc::new(InMemoryPersonStore::new());
    store
        .save_all(&[Person::new("Jane", "Roe").with_derived_email()])
        .await
        .unwrap();

    let input = csv_file("firstName,lastName\nJohn,Doe\nJane,Roe\nAnn,Lee\nBo,Ek\n");
    let job = import_persons_job(&config(&input, 4, 10), store.clone());

    let execution = launcher().run(&job, fresh_parameters()).await.unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    let step = step(&execution);
    assert_eq!(step.write_count, 3);
    assert_eq!(step.write_skip_count, 1);
    assert_eq!(step.rollback_count, 1);
    assert_eq!(store.count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_isolation_past_skip_limit_commits_nothing_after_the_fault() {
    let input = csv_file("firstName,lastName\nAnn,Lee\nAnn,Lee\nBo,Ek\nAnn,Lee\nCy,Ng\n");
    let store = Arc::new(InMemoryPersonStore::new());
    let job = import_persons_job(&config(&input, 5, 1), store.clone());
    let launcher = launcher();

    let failed = launcher.run(&job, params(11)).await.unwrap();

    assert_eq!(failed.status, BatchStatus::Failed);
    assert_eq!(step(&failed).write_count, 2);
    assert_eq!(step(&failed).write_skip_count, 2);
    assert_eq!(step(&failed).committed_position, 3);
    assert_eq!(
        emails(&store).await,
        vec!["ann.lee@example.com".to_string(), "bo.ek@example.com".to_string()]
    );

    let resumed = launcher.run(&job, params(11)).await.unwrap();

    assert_eq!(resumed.status, BatchStatus::Completed);
    let step = step(&resumed);
    assert_eq!(step.read_count, 2);
    assert_eq!(step.write_count, 1);
    assert_eq!(step.write_skip_count, 1);
    assert_eq!(store.count().await.unwrap(), 3);
}

// ============================================================================
// Launch Guards
// ============================================================================

#[tokio::test]
async fn test_duplicate_launch_while_running_is_refused() {
    let input = csv_file(&numbered_rows(3));
    let store = Arc::new(InMemoryPersonStore::new());
    let gate = Arc::new(GateWriter::new(store.clone()));
    let job = Arc::new(import_job_with_writer(&input, 10, 10, gate.clone()));
    let launcher = Arc::new(launcher());

    let first = {
        let (launcher, job) = (launcher.clone(), job.clone());
        tokio::spawn(async move { launcher.run(&job, params(1)).await })
    };
    gate.entered.notified().await;

    let duplicate = launcher.run(&job, params(1)).await;
    assert!(matches!(duplicate, Err(JobLaunchError::AlreadyRunning { .. })));

    gate.release.notify_one();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first.status, BatchStatus::Completed);

    let again = launcher.run(&job, params(1)).await;
    assert!(matches!(again, Err(JobLaunchError::AlreadyComplete { .. })));

    let fresh = launcher.run(&job, params(2)).await.unwrap();
    assert_eq!(fresh.status, BatchStatus::Completed);
}

#[tokio::test]
async fn test_missing_timestamp_is_invalid() {
    let input = csv_file(HEADER);
    let job = import_persons_job(&config(&input, 10, 10), Arc::new(InMemoryPersonStore::new()));

    let result = launcher().run(&job, JobParameters::new()).await;
    assert!(matches!(result, Err(JobLaunchError::InvalidParameters(_))));
}

// ============================================================================
// Restart
// ============================================================================

#[tokio::test]
async fn test_restart_resumes_from_committed_position() {
    let input = csv_file(&numbered_rows(5));
    let store = Arc::new(InMemoryPersonStore::new());
    let writer = Arc::new(FlakyWriter::new(store.clone(), 2));
    let job = import_job_with_writer(&input, 2, 10, writer);
    let launcher = launcher();

    let failed = launcher.run(&job, params(7)).await.unwrap();
    assert_eq!(failed.status, BatchStatus::Failed);
    assert_eq!(step(&failed).committed_position, 2);
    assert_eq!(store.count().await.unwrap(), 2);

    let resumed = launcher.run(&job, params(7)).await.unwrap();
    assert_eq!(resumed.status, BatchStatus::Completed);
    assert_eq!(resumed.instance.id, failed.instance.id);
    let step = step(&resumed);
    assert_eq!(step.read_count, 3);
    assert_eq!(step.write_count, 3);
    assert_eq!(step.skip_count, 0);
    assert_eq!(store.count().await.unwrap(), 5);

    let rerun = launcher.run(&job, params(7)).await;
    assert!(matches!(rerun, Err(JobLaunchError::AlreadyComplete { .. })));
}

#[tokio::test]
async fn test_non_restartable_job_refuses_restart() {
    let input = csv_file(&numbered_rows(3));
    let store = Arc::new(InMemoryPersonStore::new());
    store.set_available(false);
    let import = import_persons_job(&config(&input, 10, 10), store.clone());
    let job = Job::builder("oneShotImport")
        .step(import.steps()[0].clone())
        .restartable(false)
        .build();
    let launcher = launcher();

    let failed = launcher.run(&job, params(1)).await.unwrap();
    assert_eq!(failed.status, BatchStatus::Failed);

    store.set_available(true);
    let retry = launcher.run(&job, params(1)).await;
    assert!(matches!(retry, Err(JobLaunchError::RestartNotPermitted { .. })));
}

// ============================================================================
// Stop
// ============================================================================

#[tokio::test]
async fn test_stop_ends_after_current_chunk_and_can_resume() {
    let input = csv_file(&numbered_rows(5));
    let store = Arc::new(InMemoryPersonStore::new());
    let gate = Arc::new(GateWriter::new(store.clone()));
    let job = Arc::new(import_job_with_writer(&input, 2, 10, gate.clone()));
    let launcher = Arc::new(launcher());

    let run = {
        let (launcher, job) = (launcher.clone(), job.clone());
        tokio::spawn(async move { launcher.run(&job, params(3)).await })
    };
    gate.entered.notified().await;

    let running = launcher.running_executions().await;
    assert_eq!(running.len(), 1);
    let stopping = launcher.stop(running[0]).await.unwrap();
    assert_eq!(stopping.status, BatchStatus::Stopping);

    gate.release.notify_one();
    let stopped = run.await.unwrap().unwrap();
    assert_eq!(stopped.status, BatchStatus::Stopped);
    assert_eq!(step(&stopped).write_count, 2);
    assert_eq!(step(&stopped).committed_position, 2);
    assert!(launcher.running_executions().await.is_empty());

    let resumed = launcher.run(&job, params(3)).await.unwrap();
    assert_eq!(resumed.status, BatchStatus::Completed);
    assert_eq!(step(&resumed).write_count, 3);
    assert_eq!(store.count().await.unwrap(), 5);
}
