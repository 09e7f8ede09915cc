//! Person store
//!
//! [`PersonStore`] is the persistence seam used by the import writer and the
//! person queries. [`PgPersonStore`] backs it with PostgreSQL;
//! [`InMemoryPersonStore`] enforces the same constraints in process.

pub mod memory;
pub mod postgres;

use anyhow::Context;
use async_trait::async_trait;
use batchline_common::pagination::{Page, PageRequest, SortDirection};
use batchline_common::BatchlineError;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::{DatabaseConfig, StoreKind};
use crate::persons::Person;

pub use memory::InMemoryPersonStore;
pub use postgres::PgPersonStore;

/// Store failures, split by whether retrying other data could succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The data violated a constraint; nothing was written.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The store could not perform the operation at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Column a person listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersonSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    FirstName,
    LastName,
    Email,
}

impl PersonSortField {
    pub fn column(&self) -> &'static str {
        match self {
            PersonSortField::CreatedAt => "created_at",
            PersonSortField::UpdatedAt => "updated_at",
            PersonSortField::FirstName => "first_name",
            PersonSortField::LastName => "last_name",
            PersonSortField::Email => "email",
        }
    }
}

impl std::str::FromStr for PersonSortField {
    type Err = BatchlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" | "createdAt" => Ok(PersonSortField::CreatedAt),
            "updated_at" | "updatedAt" => Ok(PersonSortField::UpdatedAt),
            "first_name" | "firstName" => Ok(PersonSortField::FirstName),
            "last_name" | "lastName" => Ok(PersonSortField::LastName),
            "email" => Ok(PersonSortField::Email),
            _ => Err(BatchlineError::Parse(format!("Invalid sort field: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersonSort {
    pub field: PersonSortField,
    pub direction: SortDirection,
}

/// Persistence for person records
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Fails with [`StoreError::Unavailable`] when the store cannot be reached
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert new persons and update persisted ones in one transaction.
    ///
    /// Returns the stored records with ids and timestamps assigned. Either
    /// every record is written or none is.
    async fn save_all(&self, persons: &[Person]) -> Result<Vec<Person>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Person>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Person>, StoreError>;

    async fn list(&self, page: &PageRequest, sort: PersonSort) -> Result<Page<Person>, StoreError>;

    /// Case-insensitive substring match on either name
    async fn search_by_name(&self, name: &str, page: &PageRequest) -> Result<Page<Person>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Persons whose email ends with `@{domain}`
    async fn count_by_email_domain(&self, domain: &str) -> Result<u64, StoreError>;
}

/// Open the configured person store, migrating PostgreSQL on the way
pub async fn connect(kind: StoreKind, database: &DatabaseConfig) -> anyhow::Result<Arc<dyn PersonStore>> {
    match kind {
        StoreKind::Memory => {
            info!("Using in-memory person store");
            Ok(Arc::new(InMemoryPersonStore::new()))
        },
        StoreKind::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .min_connections(database.min_connections)
                .acquire_timeout(Duration::from_secs(database.connect_timeout_secs))
                .idle_timeout(Duration::from_secs(database.idle_timeout_secs))
                .connect(&database.url)
                .await
                .context("Failed to connect to database")?;

            info!("Database connection pool established");

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

            info!("Database migrations completed");

            Ok(Arc::new(PgPersonStore::new(pool)))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_parsing() {
        assert_eq!("created_at".parse::<PersonSortField>().unwrap(), PersonSortField::CreatedAt);
        assert_eq!("lastName".parse::<PersonSortField>().unwrap(), PersonSortField::LastName);
        assert!("id; DROP TABLE persons".parse::<PersonSortField>().is_err());
        assert_eq!(PersonSortField::Email.column(), "email");
    }

    #[tokio::test]
    async fn test_connect_memory_store() {
        let store = connect(StoreKind::Memory, &crate::config::Config::default().database)
            .await
            .unwrap();
        assert!(store.ping().await.is_ok());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let sort = PersonSort::default();
        assert_eq!(sort.field, PersonSortField::CreatedAt);
        assert_eq!(sort.direction, SortDirection::Desc);
    }
}
