//! Person statistics query

use serde::{Deserialize, Serialize};

use super::PersonQueryError;
use crate::persons::EMAIL_DOMAIN;
use crate::store::PersonStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonStatisticsQuery;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonStatistics {
    pub total_persons: u64,
    pub persons_with_example_domain_email: u64,
}

pub async fn handle(
    store: &dyn PersonStore,
    _query: PersonStatisticsQuery,
) -> Result<PersonStatistics, PersonQueryError> {
    Ok(PersonStatistics {
        total_persons: store.count().await?,
        persons_with_example_domain_email: store.count_by_email_domain(EMAIL_DOMAIN).await?,
    })
}
