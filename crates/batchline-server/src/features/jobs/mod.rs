//! Jobs feature module
//!
//! Launches the person import, reports on executions and accepts stop
//! requests.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::jobs_routes;
