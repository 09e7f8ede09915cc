//! Person API routes
//!
//! # Route Structure
//!
//! - `GET /api/persons?page&size&sort_by&sort_dir` - Paged listing
//! - `GET /api/persons/statistics` - Totals
//! - `GET /api/persons/search?name&page&size` - Name search
//! - `GET /api/persons/email/:email` - Lookup by email
//! - `GET /api/persons/:id` - Lookup by id

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use batchline_common::pagination::Page;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    queries::{
        GetPersonByEmailQuery, GetPersonQuery, ListPersonsQuery, PersonQueryError,
        PersonStatisticsQuery, SearchPersonsQuery,
    },
    PersonDto,
};
use crate::api::response::{ApiResponse, PaginationMeta};
use crate::error::AppError;
use crate::store::PersonStore;

type StoreState = Arc<dyn PersonStore>;

pub fn persons_routes() -> Router<StoreState> {
    Router::new()
        .route("/", get(list_persons))
        .route("/statistics", get(statistics))
        .route("/search", get(search_persons))
        .route("/email/:email", get(get_person_by_email))
        .route("/:id", get(get_person))
}

impl From<PersonQueryError> for AppError {
    fn from(err: PersonQueryError) -> Self {
        match err {
            PersonQueryError::NotFound(_) => AppError::NotFound(err.to_string()),
            PersonQueryError::InvalidQuery(message) => AppError::BadRequest(message),
            PersonQueryError::Store(store) => store.into(),
        }
    }
}

fn paged(page: Page<PersonDto>) -> Response {
    let meta = json!({ "pagination": PaginationMeta::from(&page) });
    ApiResponse::success_with_meta(page.items, meta).into_response()
}

#[tracing::instrument(skip(store, query), fields(page = ?query.page, size = ?query.size))]
async fn list_persons(
    State(store): State<StoreState>,
    Query(query): Query<ListPersonsQuery>,
) -> Result<Response, AppError> {
    let page = super::queries::list::handle(store.as_ref(), query).await?;
    tracing::debug!(count = page.items.len(), total = page.total, "Persons listed via API");
    Ok(paged(page))
}

#[tracing::instrument(skip(store, query), fields(name = ?query.name))]
async fn search_persons(
    State(store): State<StoreState>,
    Query(query): Query<SearchPersonsQuery>,
) -> Result<Response, AppError> {
    let page = super::queries::search::handle(store.as_ref(), query).await?;
    Ok(paged(page))
}

#[tracing::instrument(skip(store))]
async fn get_person(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest(format!("'{}' is not a valid person id", id)))?;
    let person = super::queries::get::handle(store.as_ref(), GetPersonQuery { id }).await?;
    Ok(ApiResponse::success(person).into_response())
}

#[tracing::instrument(skip(store))]
async fn get_person_by_email(
    State(store): State<StoreState>,
    Path(email): Path<String>,
) -> Result<Response, AppError> {
    let person =
        super::queries::get_by_email::handle(store.as_ref(), GetPersonByEmailQuery { email })
            .await?;
    Ok(ApiResponse::success(person).into_response())
}

async fn statistics(State(store): State<StoreState>) -> Result<Response, AppError> {
    let stats = super::queries::statistics::handle(store.as_ref(), PersonStatisticsQuery).await?;
    Ok(ApiResponse::success(stats).into_response())
}
