//! List persons query

use batchline_common::pagination::{Page, PageRequest, SortDirection};
use serde::{Deserialize, Serialize};

use super::PersonQueryError;
use crate::features::persons::PersonDto;
use crate::store::{PersonSort, PersonSortField, PersonStore};

/// `?page=0&size=20&sort_by=created_at&sort_dir=desc`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPersonsQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl ListPersonsQuery {
    pub fn page_request(&self) -> Result<PageRequest, PersonQueryError> {
        Ok(PageRequest::new(self.page, self.size)?)
    }

    pub fn sort(&self) -> Result<PersonSort, PersonQueryError> {
        let field = match self.sort_by.as_deref() {
            Some(field) => field.parse::<PersonSortField>()?,
            None => PersonSortField::default(),
        };
        let direction = match self.sort_dir.as_deref() {
            Some(direction) => direction.parse::<SortDirection>()?,
            None => SortDirection::default(),
        };
        Ok(PersonSort { field, direction })
    }
}

pub async fn handle(
    store: &dyn PersonStore,
    query: ListPersonsQuery,
) -> Result<Page<PersonDto>, PersonQueryError> {
    let page = query.page_request()?;
    let sort = query.sort()?;

    let persons = store.list(&page, sort).await?;
    Ok(persons.map(PersonDto::from))
}
