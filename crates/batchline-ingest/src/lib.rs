//! Batchline Ingest - one-shot person imports outside the HTTP server
//!
//! Runs the same `importPersonsJob` the server exposes, against either the
//! in-memory store or PostgreSQL, and reports how the run ended.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use batchline_server::batch::{BatchStatus, InMemoryJobRepository, JobExecution, JobLauncher};
use batchline_server::config::{DatabaseConfig, ImportConfig, StoreKind};
use batchline_server::persons::{fresh_parameters, import_persons_job};
use batchline_server::store;

/// Everything a single import run needs
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub import: ImportConfig,
    pub store: StoreKind,
    pub database: DatabaseConfig,
}

/// Run the import job once with a fresh timestamp parameter
pub async fn run_import(options: &ImportOptions) -> Result<JobExecution> {
    if options.import.chunk_size == 0 {
        anyhow::bail!("Chunk size must be at least 1");
    }

    let person_store = store::connect(options.store, &options.database).await?;
    let job = import_persons_job(&options.import, person_store);
    let launcher = JobLauncher::new(Arc::new(InMemoryJobRepository::new()));

    info!(
        input = %options.import.input_path.display(),
        chunk_size = options.import.chunk_size,
        skip_limit = options.import.skip_limit,
        "Launching person import"
    );

    launcher
        .run(&job, fresh_parameters())
        .await
        .context("Failed to launch import job")
}

/// Log the counters of every step and the failures of a finished run
pub fn log_summary(execution: &JobExecution) {
    info!(
        job = execution.job_name(),
        execution_id = execution.id,
        status = %execution.status,
        "Import finished"
    );

    for step in &execution.step_executions {
        info!(
            step = %step.step_name,
            read = step.read_count,
            written = step.write_count,
            filtered = step.filter_count,
            skipped = step.skip_count,
            commits = step.commit_count,
            rollbacks = step.rollback_count,
            "Step summary"
        );
    }

    for failure in execution.all_failures() {
        tracing::error!("{}", failure);
    }
}

/// Whether the process should report success for this run
pub fn succeeded(execution: &JobExecution) -> bool {
    execution.status == BatchStatus::Completed
}
