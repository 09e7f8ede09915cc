//! Feature modules implementing the Batchline API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes:
//!
//! - **jobs**: trigger the person import, inspect and stop executions
//! - **persons**: read-only queries over imported persons
//!
//! # Architecture
//!
//! - `commands/` - Operations that change state (launch, stop)
//! - `queries/` - Read operations (get, list, search)
//! - `routes.rs` - HTTP route definitions
//! - `types.rs` - Shared response types (if needed)

pub mod jobs;
pub mod persons;

use axum::Router;
use std::sync::Arc;

use crate::batch::{Job, JobLauncher};
use crate::store::PersonStore;

/// State for the job routes
#[derive(Clone)]
pub struct JobsState {
    pub launcher: Arc<JobLauncher>,
    /// The job launched by `POST /jobs/import-persons`
    pub job: Arc<Job>,
}

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub store: Arc<dyn PersonStore>,
    pub jobs: JobsState,
}

/// Creates the API router with all feature routes mounted
///
/// - `/jobs` - Import job control and execution status
/// - `/persons` - Person queries
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/jobs", jobs::jobs_routes().with_state(state.jobs))
        .nest("/persons", persons::persons_routes().with_state(state.store))
}
