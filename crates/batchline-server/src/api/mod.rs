//! HTTP application assembly

pub mod response;

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::config::CorsConfig;
use crate::features::{self, FeatureState};
use crate::middleware;

/// Build the full application: feature routes under `/api` plus middleware
pub fn create_router(state: FeatureState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/api", features::router(state))
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Batchline Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
