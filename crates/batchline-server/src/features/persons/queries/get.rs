//! Get person by id query

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PersonQueryError;
use crate::features::persons::PersonDto;
use crate::store::PersonStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPersonQuery {
    pub id: Uuid,
}

pub async fn handle(
    store: &dyn PersonStore,
    query: GetPersonQuery,
) -> Result<PersonDto, PersonQueryError> {
    store
        .find_by_id(query.id)
        .await?
        .map(PersonDto::from)
        .ok_or_else(|| PersonQueryError::NotFound(query.id.to_string()))
}
