pub mod get;
pub mod get_by_email;
pub mod list;
pub mod search;
pub mod statistics;

pub use get::GetPersonQuery;
pub use get_by_email::GetPersonByEmailQuery;
pub use list::ListPersonsQuery;
pub use search::SearchPersonsQuery;
pub use statistics::{PersonStatistics, PersonStatisticsQuery};

use thiserror::Error;

use crate::store::StoreError;

/// Error type shared by the person queries
#[derive(Debug, Error)]
pub enum PersonQueryError {
    #[error("Person not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<batchline_common::BatchlineError> for PersonQueryError {
    fn from(err: batchline_common::BatchlineError) -> Self {
        PersonQueryError::InvalidQuery(err.to_string())
    }
}
