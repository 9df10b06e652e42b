//! Optimistic concurrency guard for entity updates.
//!
//! ```text
//! Loaded ──stored.modified_at > incoming──> Conflict (no write)
//!   │
//!   ├──merge, no diff──> success, no write, no re-stamp
//!   │
//!   └──merge, diff──> Dirty ──write 1 row──> Clean
//!                        └──write 0 rows──> NotFound
//! ```

use crate::core::{Clock, DocketError, EntityId, Result, SystemClock};
use crate::storage::{RowKey, StoreTransaction};
use crate::tracking::{ChangeTracked, Tracked};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a guarded update.
#[derive(Debug, Clone)]
pub struct UpdateOutcome<E> {
    /// Whether a row was written.
    pub changed: bool,
    /// Names of the fields that differed from the stored row.
    pub fields: Vec<&'static str>,
    /// The entity as it now stands in the transaction.
    pub entity: E,
}

#[derive(Clone)]
pub struct UpdateGuard {
    clock: Arc<dyn Clock>,
}

impl UpdateGuard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Apply `partial` to entity `id` inside the caller's transaction.
    ///
    /// `partial.audit().modified_at` is the concurrency token: the
    /// modification stamp the editor saw when it loaded the entity. If the
    /// stored stamp is strictly newer the update fails with `Conflict` and
    /// nothing is written. Retrying is the caller's decision.
    pub async fn update<T, E>(
        &self,
        tx: &mut T,
        id: EntityId,
        partial: &E,
        actor: &str,
    ) -> Result<UpdateOutcome<E>>
    where
        T: StoreTransaction,
        E: ChangeTracked,
    {
        let key = RowKey::Id(id);

        let row = tx
            .fetch_for_update(E::TABLE, &key)
            .await?
            .ok_or_else(|| DocketError::not_found(E::TABLE, id))?;
        let stored: E = serde_json::from_value(row)?;

        let incoming = partial.audit().modified_at;
        let current = stored.audit().modified_at;
        if current > incoming {
            warn!(
                txn = %tx.id(),
                table = E::TABLE,
                id,
                %current,
                %incoming,
                "stale update rejected"
            );
            return Err(DocketError::Conflict {
                table: E::TABLE,
                id,
                stored: current,
                incoming,
            });
        }

        let mut tracked = Tracked::capture(stored);
        tracked.merge_from(partial);
        let fields = tracked.changed_fields();

        if fields.is_empty() {
            debug!(txn = %tx.id(), table = E::TABLE, id, "update is a no-op; nothing written");
            return Ok(UpdateOutcome {
                changed: false,
                fields,
                entity: tracked.into_inner(),
            });
        }

        tracked
            .current_mut()
            .audit_mut()
            .stamp_modified(actor, self.clock.now());
        let entity = tracked.into_inner();

        let affected = tx
            .update(E::TABLE, &key, serde_json::to_value(&entity)?)
            .await?;
        if affected == 0 {
            return Err(DocketError::not_found(E::TABLE, id));
        }

        info!(
            txn = %tx.id(),
            table = E::TABLE,
            id,
            fields = ?fields,
            actor,
            "entity updated"
        );
        Ok(UpdateOutcome {
            changed: true,
            fields,
            entity,
        })
    }
}

impl Default for UpdateGuard {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AuditFields, ManualClock};
    use crate::domain::User;
    use crate::repository::Repository;
    use crate::storage::{MemoryStore, MemoryTransaction, Row, TransactionalStore};
    use crate::transaction::TransactionId;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    /// Delegates to a memory transaction, except that every `update`
    /// reports that the row disappeared before it could be written.
    struct RowGoneOnWrite {
        inner: MemoryTransaction,
    }

    #[async_trait]
    impl StoreTransaction for RowGoneOnWrite {
        fn id(&self) -> TransactionId {
            self.inner.id()
        }

        async fn fetch(&mut self, table: &str, key: &RowKey) -> Result<Option<Row>> {
            self.inner.fetch(table, key).await
        }

        async fn fetch_for_update(&mut self, table: &str, key: &RowKey) -> Result<Option<Row>> {
            self.inner.fetch_for_update(table, key).await
        }

        async fn scan(&mut self, table: &str) -> Result<Vec<(RowKey, Row)>> {
            self.inner.scan(table).await
        }

        async fn allocate_id(&mut self, table: &str) -> Result<i64> {
            self.inner.allocate_id(table).await
        }

        async fn insert(&mut self, table: &str, key: RowKey, row: Row) -> Result<()> {
            self.inner.insert(table, key, row).await
        }

        async fn update(&mut self, _table: &str, _key: &RowKey, _row: Row) -> Result<u64> {
            Ok(0)
        }

        async fn delete(&mut self, table: &str, key: &RowKey) -> Result<u64> {
            self.inner.delete(table, key).await
        }

        async fn commit(self) -> Result<()> {
            self.inner.commit().await
        }

        async fn rollback(self) -> Result<()> {
            self.inner.rollback().await
        }
    }

    async fn seeded_user(store: &MemoryStore, clock: Arc<ManualClock>) -> User {
        let users: Repository<User> = Repository::new(clock);
        let mut tx = store.begin().await.unwrap();
        let user = users
            .insert(
                &mut tx,
                User {
                    username: "alice".into(),
                    department: "Purchasing".into(),
                    ..User::default()
                },
                "admin",
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_write_affecting_no_rows_is_not_found() {
        let start = Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let store = MemoryStore::new();
        let alice = seeded_user(&store, clock.clone()).await;
        clock.advance(Duration::minutes(1));

        let guard = UpdateGuard::new(clock.clone());
        let mut tx = RowGoneOnWrite {
            inner: store.begin().await.unwrap(),
        };
        let partial = User {
            department: "Finance".into(),
            audit: AuditFields::token(alice.audit.modified_at),
            ..User::default()
        };

        let err = guard.update(&mut tx, alice.id, &partial, "bob").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        tx.commit().await.unwrap();

        let mut reader = store.begin().await.unwrap();
        let row = reader
            .fetch(User::TABLE, &RowKey::Id(alice.id))
            .await
            .unwrap()
            .unwrap();
        let stored: User = serde_json::from_value(row).unwrap();
        assert_eq!(stored, alice);
    }

    #[tokio::test]
    async fn test_noop_never_reaches_the_write() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryStore::new();
        let alice = seeded_user(&store, clock.clone()).await;

        let guard = UpdateGuard::new(clock);
        let mut tx = RowGoneOnWrite {
            inner: store.begin().await.unwrap(),
        };
        let partial = User {
            department: "Purchasing".into(),
            audit: AuditFields::token(alice.audit.modified_at),
            ..User::default()
        };

        let outcome = guard.update(&mut tx, alice.id, &partial, "bob").await.unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.entity.audit, alice.audit);
    }
}
