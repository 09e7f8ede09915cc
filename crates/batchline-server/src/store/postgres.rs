//! PostgreSQL person store

use async_trait::async_trait;
use batchline_common::pagination::{Page, PageRequest};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{PersonSort, PersonStore, StoreError};
use crate::persons::Person;

const PERSON_COLUMNS: &str = "id, first_name, last_name, email, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PersonRecord {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PersonRecord> for Person {
    fn from(record: PersonRecord) -> Self {
        Person {
            id: Some(record.id),
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
        }
    }
}

/// Map a driver error onto the store taxonomy
///
/// Integrity (class 23) and data (class 22) violations mean the data was
/// refused; everything else means the store itself is in trouble.
fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => {
            let code = db.code().unwrap_or_default();
            if code.starts_with("23") || code.starts_with("22") {
                StoreError::Rejected(db.message().to_string())
            } else {
                StoreError::Unavailable(err.to_string())
            }
        },
        _ => StoreError::Unavailable(err.to_string()),
    }
}

/// Escape `%`, `_` and `\` for use inside a LIKE pattern
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Person store backed by the `persons` table
#[derive(Debug, Clone)]
pub struct PgPersonStore {
    pool: PgPool,
}

impl PgPersonStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn save_one(
        tx: &mut Transaction<'_, Postgres>,
        person: &Person,
    ) -> Result<Person, StoreError> {
        person.check_constraints().map_err(StoreError::Rejected)?;

        let record = match person.id {
            None => {
                let sql = format!(
                    "INSERT INTO persons (id, first_name, last_name, email) \
                     VALUES ($1, $2, $3, $4) RETURNING {}",
                    PERSON_COLUMNS
                );
                sqlx::query_as::<_, PersonRecord>(&sql)
                    .bind(Uuid::new_v4())
                    .bind(&person.first_name)
                    .bind(&person.last_name)
                    .bind(&person.email)
                    .fetch_one(&mut **tx)
                    .await
                    .map_err(classify)?
            },
            Some(id) => {
                let sql = format!(
                    "UPDATE persons SET first_name = $2, last_name = $3, email = $4, \
                     updated_at = NOW() WHERE id = $1 RETURNING {}",
                    PERSON_COLUMNS
                );
                sqlx::query_as::<_, PersonRecord>(&sql)
                    .bind(id)
                    .bind(&person.first_name)
                    .bind(&person.last_name)
                    .bind(&person.email)
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(classify)?
                    .ok_or_else(|| StoreError::Rejected(format!("person {} does not exist", id)))?
            },
        };

        Ok(record.into())
    }

    async fn count_where(&self, clause: &str, pattern: Option<&str>) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM persons {}", clause);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(pattern) = pattern {
            query = query.bind(pattern);
        }
        let count = query.fetch_one(&self.pool).await.map_err(classify)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl PersonStore for PgPersonStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, persons), fields(count = persons.len()))]
    async fn save_all(&self, persons: &[Person]) -> Result<Vec<Person>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut saved = Vec::with_capacity(persons.len());
        for person in persons {
            saved.push(Self::save_one(&mut tx, person).await?);
        }

        tx.commit().await.map_err(classify)?;
        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Person>, StoreError> {
        let sql = format!("SELECT {} FROM persons WHERE id = $1", PERSON_COLUMNS);
        let record = sqlx::query_as::<_, PersonRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        Ok(record.map(Person::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Person>, StoreError> {
        let sql = format!("SELECT {} FROM persons WHERE email = $1", PERSON_COLUMNS);
        let record = sqlx::query_as::<_, PersonRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        Ok(record.map(Person::from))
    }

    async fn list(&self, page: &PageRequest, sort: PersonSort) -> Result<Page<Person>, StoreError> {
        // Column and direction come from closed enums, never from raw input
        let sql = format!(
            "SELECT {} FROM persons ORDER BY {} {}, id LIMIT $1 OFFSET $2",
            PERSON_COLUMNS,
            sort.field.column(),
            sort.direction.to_string().to_uppercase()
        );
        let records = sqlx::query_as::<_, PersonRecord>(&sql)
            .bind(i64::from(page.size))
            .bind(to_i64(page.offset()))
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        let total = self.count().await?;

        Ok(Page::new(records.into_iter().map(Person::from).collect(), page, total))
    }

    async fn search_by_name(&self, name: &str, page: &PageRequest) -> Result<Page<Person>, StoreError> {
        let pattern = format!("%{}%", escape_like(&name.to_lowercase()));
        let clause = "WHERE LOWER(first_name) LIKE $1 ESCAPE '\\' OR LOWER(last_name) LIKE $1 ESCAPE '\\'";

        let sql = format!(
            "SELECT {} FROM persons {} ORDER BY last_name, first_name, id LIMIT $2 OFFSET $3",
            PERSON_COLUMNS, clause
        );
        let records = sqlx::query_as::<_, PersonRecord>(&sql)
            .bind(&pattern)
            .bind(i64::from(page.size))
            .bind(to_i64(page.offset()))
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        let total = self.count_where(clause, Some(&pattern)).await?;

        Ok(Page::new(records.into_iter().map(Person::from).collect(), page, total))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.count_where("", None).await
    }

    async fn count_by_email_domain(&self, domain: &str) -> Result<u64, StoreError> {
        let pattern = format!("%@{}", escape_like(domain));
        self.count_where("WHERE email LIKE $1 ESCAPE '\\'", Some(&pattern)).await
    }
}
