//! Get person by email query

use serde::{Deserialize, Serialize};

use super::PersonQueryError;
use crate::features::persons::PersonDto;
use crate::store::PersonStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPersonByEmailQuery {
    pub email: String,
}

pub async fn handle(
    store: &dyn PersonStore,
    query: GetPersonByEmailQuery,
) -> Result<PersonDto, PersonQueryError> {
    store
        .find_by_email(&query.email)
        .await?
        .map(PersonDto::from)
        .ok_or(PersonQueryError::NotFound(query.email))
}
