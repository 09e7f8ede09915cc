//! Job routes
//!
//! # Route Structure
//!
//! - `GET /api/jobs/health` - Liveness message
//! - `GET /api/jobs/info` - Name and description of the import job
//! - `POST /api/jobs/import-persons` - Run the import and wait for the result
//! - `GET /api/jobs/executions/:id` - Status, step counters and failures
//! - `POST /api/jobs/executions/:id/stop` - Ask a running execution to stop

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::{
    commands::{RunImportCommand, StopExecutionCommand},
    queries::{GetExecutionError, GetExecutionQuery, JobInfoQuery},
};
use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::JobsState;

/// Liveness message returned by the health endpoint
pub const HEALTH_MESSAGE: &str = "Batchline server is running";

// ============================================================================
// Router Configuration
// ============================================================================

pub fn jobs_routes() -> Router<JobsState> {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(job_info))
        .route("/import-persons", post(run_import))
        .route("/executions/:id", get(get_execution))
        .route("/executions/:id/stop", post(stop_execution))
}

impl From<GetExecutionError> for AppError {
    fn from(err: GetExecutionError) -> Self {
        AppError::NotFound(err.to_string())
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

/// Run the person import
///
/// Blocks until the execution finishes. Launch errors map to `409 Conflict`
/// (running, complete, restart not permitted) or `400 Bad Request`
/// (invalid parameters). A job that runs and fails still answers `200` with
/// status `FAILED`.
#[tracing::instrument(skip(state))]
async fn run_import(State(state): State<JobsState>) -> Result<Response, AppError> {
    let result = super::commands::run_import::handle(&state, RunImportCommand).await?;

    tracing::info!(
        job_execution_id = result.job_execution_id,
        status = %result.status,
        "Import job finished via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(result))).into_response())
}

#[tracing::instrument(skip(state))]
async fn stop_execution(
    State(state): State<JobsState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let result =
        super::commands::stop_execution::handle(&state, StopExecutionCommand { execution_id: id })
            .await?;

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(result))).into_response())
}

// ============================================================================
// Query Handlers
// ============================================================================

async fn health() -> Response {
    ApiResponse::success(HEALTH_MESSAGE).into_response()
}

async fn job_info(State(state): State<JobsState>) -> Response {
    ApiResponse::success(super::queries::job_info::handle(&state, JobInfoQuery)).into_response()
}

#[tracing::instrument(skip(state))]
async fn get_execution(
    State(state): State<JobsState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let details =
        super::queries::get_execution::handle(&state, GetExecutionQuery { execution_id: id })
            .await?;

    Ok(ApiResponse::success(details).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    use crate::batch::{InMemoryJobRepository, JobLauncher};
    use crate::config::ImportConfig;
    use crate::persons::import_persons_job;
    use crate::store::InMemoryPersonStore;

    fn csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn state(input: &NamedTempFile) -> JobsState {
        let config = ImportConfig {
            input_path: input.path().to_path_buf(),
            ..ImportConfig::default()
        };
        let store = Arc::new(InMemoryPersonStore::new());
        JobsState {
            launcher: Arc::new(JobLauncher::new(Arc::new(InMemoryJobRepository::new()))),
            job: Arc::new(import_persons_job(&config, store)),
        }
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_and_info() {
        let input = csv("firstName,lastName\n");
        let app = jobs_routes().with_state(state(&input));

        let (status, body) = send(app.clone(), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], HEALTH_MESSAGE);

        let (status, body) = send(app, "GET", "/info").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["jobName"], "importPersonsJob");
        assert_eq!(body["data"]["jobDescription"], "Import persons from CSV to database");
    }

    #[tokio::test]
    async fn test_import_then_get_execution() {
        let input = csv("firstName,lastName\nJohn,Doe\n,Smith\nJane,Roe\n");
        let app = jobs_routes().with_state(state(&input));

        let (status, body) = send(app.clone(), "POST", "/import-persons").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "COMPLETED");
        let id = body["data"]["jobExecutionId"].as_i64().unwrap();

        let (status, body) = send(app, "GET", &format!("/executions/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        let step = &body["data"]["steps"][0];
        assert_eq!(step["stepName"], "importPersonsStep");
        assert_eq!(step["writeCount"], 2);
        assert_eq!(step["filterCount"], 1);
        assert_eq!(step["skipCount"], 0);
    }

    #[tokio::test]
    async fn test_failed_run_reports_failed_status() {
        let app = jobs_routes().with_state({
            let missing = NamedTempFile::new().unwrap();
            let path = missing.path().to_path_buf();
            drop(missing);
            let config = ImportConfig {
                input_path: path,
                ..ImportConfig::default()
            };
            JobsState {
                launcher: Arc::new(JobLauncher::new(Arc::new(InMemoryJobRepository::new()))),
                job: Arc::new(import_persons_job(&config, Arc::new(InMemoryPersonStore::new()))),
            }
        });

        let (status, body) = send(app, "POST", "/import-persons").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "FAILED");
    }

    #[tokio::test]
    async fn test_unknown_execution_is_not_found() {
        let input = csv("firstName,lastName\n");
        let app = jobs_routes().with_state(state(&input));

        let (status, body) = send(app.clone(), "GET", "/executions/42").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) = send(app, "POST", "/executions/42/stop").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stopping_finished_execution_conflicts() {
        let input = csv("firstName,lastName\nJohn,Doe\n");
        let app = jobs_routes().with_state(state(&input));

        let (_, body) = send(app.clone(), "POST", "/import-persons").await;
        let id = body["data"]["jobExecutionId"].as_i64().unwrap();

        let (status, body) = send(app, "POST", &format!("/executions/{}/stop", id)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "JOB_NOT_RUNNING");
    }
}
