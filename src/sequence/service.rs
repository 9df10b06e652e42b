use super::definition::SequenceDefinition;
use super::format::Template;
use super::store::SequenceStore;
use crate::core::{DocketError, Result};
use crate::storage::StoreTransaction;

/// Issues formatted document numbers.
///
/// Joins the caller's transaction and never commits it: the reservation
/// becomes durable together with whatever document the caller inserts.
#[derive(Clone, Default)]
pub struct SequenceService {
    store: SequenceStore,
}

impl SequenceService {
    pub fn new(store: SequenceStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SequenceStore {
        &self.store
    }

    /// Reserve the module's next number and render it with the module's template.
    pub async fn next_number_by_module<T: StoreTransaction>(
        &self,
        tx: &mut T,
        module: &str,
    ) -> Result<String> {
        let definition = self.store.reserve(tx, module).await?;
        self.render(&definition, definition.last_number)
    }

    /// Render the number the next reservation would return, without locking
    /// or consuming it. Concurrent callers may see the same preview.
    pub async fn preview<T: StoreTransaction>(&self, tx: &mut T, module: &str) -> Result<String> {
        let definition = self.store.get(tx, module).await?;
        let next = definition.next_number().ok_or_else(|| {
            DocketError::InvalidDefinition(format!("counter for module '{module}' is exhausted"))
        })?;
        self.render(&definition, next)
    }

    fn render(&self, definition: &SequenceDefinition, value: u64) -> Result<String> {
        let template = Template::parse_with(&definition.template, self.store.placeholder())?;
        Ok(template.render(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, TransactionalStore};

    async fn seeded() -> (MemoryStore, SequenceService) {
        let db = MemoryStore::new();
        let service = SequenceService::default();
        let mut tx = db.begin().await.unwrap();
        service
            .store()
            .define(&mut tx, "PO", "PO-#####", 10, "admin")
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (db, service)
    }

    #[tokio::test]
    async fn test_next_number_is_formatted() {
        let (db, service) = seeded().await;
        let mut tx = db.begin().await.unwrap();
        assert_eq!(
            service.next_number_by_module(&mut tx, "PO").await.unwrap(),
            "PO-00011"
        );
        assert_eq!(
            service.next_number_by_module(&mut tx, "PO").await.unwrap(),
            "PO-00012"
        );
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_preview_does_not_consume() {
        let (db, service) = seeded().await;
        let mut tx = db.begin().await.unwrap();
        assert_eq!(service.preview(&mut tx, "PO").await.unwrap(), "PO-00011");
        assert_eq!(service.preview(&mut tx, "PO").await.unwrap(), "PO-00011");
        assert_eq!(
            service.next_number_by_module(&mut tx, "PO").await.unwrap(),
            "PO-00011"
        );
        assert_eq!(service.preview(&mut tx, "PO").await.unwrap(), "PO-00012");
    }

    #[tokio::test]
    async fn test_service_does_not_commit() {
        let (db, service) = seeded().await;
        {
            let mut tx = db.begin().await.unwrap();
            service.next_number_by_module(&mut tx, "PO").await.unwrap();
        }

        let mut tx = db.begin().await.unwrap();
        assert_eq!(
            service.next_number_by_module(&mut tx, "PO").await.unwrap(),
            "PO-00011"
        );
    }

    #[tokio::test]
    async fn test_unknown_module() {
        let (db, service) = seeded().await;
        let mut tx = db.begin().await.unwrap();
        let err = service.next_number_by_module(&mut tx, "XX").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
