//! Batchline Server Library
//!
//! Chunk-oriented batch processing with a person import job and an HTTP API.
//!
//! # Overview
//!
//! - **Batch engine** ([`batch`]): jobs, steps, chunked read/process/write
//!   with skip budgets, restart from the last committed position, stop
//!   requests and lifecycle listeners
//! - **Person import** ([`persons`]): CSV reader, email-deriving processor
//!   and store-backed writer assembled into `importPersonsJob`
//! - **Record store** ([`store`]): PostgreSQL via SQLx, or in memory
//! - **API** ([`api`], [`features`]): Axum routes to launch and inspect jobs
//!   and query persons
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use batchline_server::batch::{InMemoryJobRepository, JobLauncher};
//! use batchline_server::config::ImportConfig;
//! use batchline_server::persons::{fresh_parameters, import_persons_job};
//! use batchline_server::store::InMemoryPersonStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let job = import_persons_job(&ImportConfig::default(), Arc::new(InMemoryPersonStore::new()));
//!     let launcher = JobLauncher::new(Arc::new(InMemoryJobRepository::new()));
//!     let execution = launcher.run(&job, fresh_parameters()).await?;
//!     println!("{}", execution.status);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod persons;
pub mod store;

// Re-export commonly used types
pub use error::{ApiResult, AppError};
