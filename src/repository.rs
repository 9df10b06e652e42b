use crate::concurrency::{UpdateGuard, UpdateOutcome};
use crate::core::{AuditFields, Clock, DocketError, EntityId, Result, SystemClock};
use crate::storage::{Row, RowKey, StoreTransaction};
use crate::tracking::{ChangeTracked, Tracked};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Generic CRUD by id for one entity type.
///
/// Every call runs inside the caller's transaction. Single-entity reads
/// return a `Tracked` value ready for merging; list and search results are
/// plain, untracked values.
pub struct Repository<E> {
    clock: Arc<dyn Clock>,
    guard: UpdateGuard,
    _entity: PhantomData<fn() -> E>,
}

impl<E: ChangeTracked> Repository<E> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            guard: UpdateGuard::new(Arc::clone(&clock)),
            clock,
            _entity: PhantomData,
        }
    }

    /// Insert a new entity under a freshly allocated id.
    ///
    /// Any id or audit values on `entity` are replaced.
    pub async fn insert<T: StoreTransaction>(
        &self,
        tx: &mut T,
        mut entity: E,
        actor: &str,
    ) -> Result<E> {
        let id = tx.allocate_id(E::TABLE).await?;
        entity.set_id(id);
        *entity.audit_mut() = AuditFields::created(actor, self.clock.now());

        tx.insert(E::TABLE, RowKey::Id(id), encode(&entity)?).await?;
        debug!(txn = %tx.id(), table = E::TABLE, id, actor, "entity inserted");
        Ok(entity)
    }

    pub async fn find<T: StoreTransaction>(&self, tx: &mut T, id: EntityId) -> Result<Option<E>> {
        tx.fetch(E::TABLE, &RowKey::Id(id))
            .await?
            .map(decode::<E>)
            .transpose()
    }

    /// Fetch an entity and capture its baseline.
    pub async fn get<T: StoreTransaction>(&self, tx: &mut T, id: EntityId) -> Result<Tracked<E>> {
        let entity = self
            .find(tx, id)
            .await?
            .ok_or_else(|| DocketError::not_found(E::TABLE, id))?;
        Ok(Tracked::capture(entity))
    }

    pub async fn list<T: StoreTransaction>(&self, tx: &mut T) -> Result<Vec<E>> {
        self.search(tx, |_| true).await
    }

    pub async fn search<T, F>(&self, tx: &mut T, predicate: F) -> Result<Vec<E>>
    where
        T: StoreTransaction,
        F: Fn(&E) -> bool + Send,
    {
        let mut found = Vec::new();
        for (_, row) in tx.scan(E::TABLE).await? {
            let entity = decode(row)?;
            if predicate(&entity) {
                found.push(entity);
            }
        }
        Ok(found)
    }

    /// Guarded partial update; see `UpdateGuard::update`.
    pub async fn update<T: StoreTransaction>(
        &self,
        tx: &mut T,
        id: EntityId,
        partial: &E,
        actor: &str,
    ) -> Result<UpdateOutcome<E>> {
        self.guard.update(tx, id, partial, actor).await
    }

    /// Write back the merged state of a tracked entity.
    ///
    /// The baseline's modification stamp is the concurrency token. On
    /// success the tracked value is re-baselined on what was stored.
    pub async fn save<T: StoreTransaction>(
        &self,
        tx: &mut T,
        tracked: &mut Tracked<E>,
        actor: &str,
    ) -> Result<bool> {
        if !tracked.is_changed() {
            return Ok(false);
        }

        let mut partial = tracked.get().clone();
        partial.audit_mut().modified_at = tracked.baseline().audit().modified_at;

        let outcome = self.guard.update(tx, tracked.id(), &partial, actor).await?;
        *tracked = Tracked::capture(outcome.entity);
        Ok(outcome.changed)
    }

    pub async fn delete<T: StoreTransaction>(&self, tx: &mut T, id: EntityId) -> Result<()> {
        if tx.delete(E::TABLE, &RowKey::Id(id)).await? == 0 {
            return Err(DocketError::not_found(E::TABLE, id));
        }
        debug!(txn = %tx.id(), table = E::TABLE, id, "entity deleted");
        Ok(())
    }
}

impl<E: ChangeTracked> Default for Repository<E> {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            clock: Arc::clone(&self.clock),
            guard: self.guard.clone(),
            _entity: PhantomData,
        }
    }
}

fn encode<E: ChangeTracked>(entity: &E) -> Result<Row> {
    Ok(serde_json::to_value(entity)?)
}

fn decode<E: ChangeTracked>(row: Row) -> Result<E> {
    Ok(serde_json::from_value(row)?)
}
