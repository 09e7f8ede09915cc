//! In-process person store

use async_trait::async_trait;
use batchline_common::pagination::{Page, PageRequest, SortDirection};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PersonSort, PersonSortField, PersonStore, StoreError};
use crate::persons::Person;

/// Person store kept in memory, in insertion order
#[derive(Debug)]
pub struct InMemoryPersonStore {
    persons: RwLock<Vec<Person>>,
    available: AtomicBool,
}

impl Default for InMemoryPersonStore {
    fn default() -> Self {
        Self {
            persons: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryPersonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing or regaining the backing store
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        }
    }

    /// Snapshot of every stored person
    pub async fn all(&self) -> Vec<Person> {
        self.persons.read().await.clone()
    }
}

fn paginate(matches: Vec<Person>, page: &PageRequest) -> Page<Person> {
    let total = matches.len() as u64;
    let items = matches
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(page.size as usize)
        .collect();
    Page::new(items, page, total)
}

#[async_trait]
impl PersonStore for InMemoryPersonStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn save_all(&self, persons: &[Person]) -> Result<Vec<Person>, StoreError> {
        self.check_available()?;
        let mut stored = self.persons.write().await;

        // Validate the whole batch before touching anything
        let mut emails: HashSet<&str> = stored
            .iter()
            .filter(|p| !persons.iter().any(|n| n.id.is_some() && n.id == p.id))
            .filter_map(|p| p.email.as_deref())
            .collect();
        for person in persons {
            person.check_constraints().map_err(StoreError::Rejected)?;
            if let Some(id) = person.id {
                if !stored.iter().any(|p| p.id == Some(id)) {
                    return Err(StoreError::Rejected(format!("person {} does not exist", id)));
                }
            }
            if let Some(email) = person.email.as_deref() {
                if !emails.insert(email) {
                    return Err(StoreError::Rejected(format!(
                        "duplicate key value violates unique constraint on email: {}",
                        email
                    )));
                }
            }
        }

        let now = Utc::now();
        let mut saved = Vec::with_capacity(persons.len());
        for person in persons {
            let mut record = person.clone();
            record.updated_at = Some(now);
            match record.id {
                Some(id) => {
                    if let Some(existing) = stored.iter_mut().find(|p| p.id == Some(id)) {
                        record.created_at = existing.created_at;
                        *existing = record.clone();
                    }
                },
                None => {
                    record.id = Some(Uuid::new_v4());
                    record.created_at = Some(now);
                    stored.push(record.clone());
                },
            }
            saved.push(record);
        }

        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Person>, StoreError> {
        self.check_available()?;
        let stored = self.persons.read().await;
        Ok(stored.iter().find(|p| p.id == Some(id)).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Person>, StoreError> {
        self.check_available()?;
        let stored = self.persons.read().await;
        Ok(stored.iter().find(|p| p.email.as_deref() == Some(email)).cloned())
    }

    async fn list(&self, page: &PageRequest, sort: PersonSort) -> Result<Page<Person>, StoreError> {
        self.check_available()?;
        let mut all = self.persons.read().await.clone();

        all.sort_by(|a, b| {
            let ordering = match sort.field {
                PersonSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                PersonSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                PersonSortField::FirstName => a.first_name.cmp(&b.first_name),
                PersonSortField::LastName => a.last_name.cmp(&b.last_name),
                PersonSortField::Email => a.email.cmp(&b.email),
            };
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        Ok(paginate(all, page))
    }

    async fn search_by_name(&self, name: &str, page: &PageRequest) -> Result<Page<Person>, StoreError> {
        self.check_available()?;
        let needle = name.to_lowercase();
        let mut matches: Vec<Person> = self
            .persons
            .read()
            .await
            .iter()
            .filter(|p| {
                p.first_name.to_lowercase().contains(&needle)
                    || p.last_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str()).cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });

        Ok(paginate(matches, page))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self.persons.read().await.len() as u64)
    }

    async fn count_by_email_domain(&self, domain: &str) -> Result<u64, StoreError> {
        self.check_available()?;
        let suffix = format!("@{}", domain);
        let stored = self.persons.read().await;
        Ok(stored
            .iter()
            .filter(|p| p.email.as_deref().is_some_and(|e| e.ends_with(&suffix)))
            .count() as u64)
    }
}
