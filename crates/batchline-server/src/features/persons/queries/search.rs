//! Search persons by name query

use batchline_common::pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};

use super::PersonQueryError;
use crate::features::persons::PersonDto;
use crate::store::PersonStore;

/// `?name=doe&page=0&size=20`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPersonsQuery {
    pub name: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl SearchPersonsQuery {
    pub fn validate(&self) -> Result<&str, PersonQueryError> {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(PersonQueryError::InvalidQuery(
                "query parameter 'name' is required".to_string(),
            )),
        }
    }
}

/// Case-insensitive substring match on first or last name
pub async fn handle(
    store: &dyn PersonStore,
    query: SearchPersonsQuery,
) -> Result<Page<PersonDto>, PersonQueryError> {
    let name = query.validate()?;
    let page = PageRequest::new(query.page, query.size)?;

    let persons = store.search_by_name(name, &page).await?;
    Ok(persons.map(PersonDto::from))
}
