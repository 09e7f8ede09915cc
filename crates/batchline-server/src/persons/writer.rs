//! Writes processed persons to the person store

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::model::Person;
use crate::batch::{ItemWriter, WriteError};
use crate::store::{PersonStore, StoreError};

impl From<StoreError> for WriteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(cause) => WriteError::Rejected(cause),
            StoreError::Unavailable(cause) => WriteError::Unavailable(cause),
        }
    }
}

/// Saves each chunk of persons in one store transaction
#[derive(Clone)]
pub struct PersonStoreWriter {
    store: Arc<dyn PersonStore>,
}

impl PersonStoreWriter {
    pub fn new(store: Arc<dyn PersonStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ItemWriter<Person> for PersonStoreWriter {
    async fn open(&self) -> Result<(), WriteError> {
        self.store.ping().await?;
        Ok(())
    }

    async fn write(&self, items: &[Person]) -> Result<(), WriteError> {
        let saved = self.store.save_all(items).await?;
        debug!(count = saved.len(), "Persons saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPersonStore;

    #[tokio::test]
    async fn test_store_errors_map_to_write_errors() {
        let store = Arc::new(InMemoryPersonStore::new());
        let writer = PersonStoreWriter::new(store.clone());
        let person = Person::new("John", "Doe").with_derived_email();

        writer.open().await.unwrap();
        writer.write(std::slice::from_ref(&person)).await.unwrap();
        assert!(matches!(
            writer.write(std::slice::from_ref(&person)).await,
            Err(WriteError::Rejected(_))
        ));

        store.set_available(false);
        assert!(matches!(writer.open().await, Err(WriteError::Unavailable(_))));
    }
}
