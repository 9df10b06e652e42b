use super::engine::{Row, RowKey, StoreTransaction, TransactionalStore};
use super::locks::{LockKey, LockTable, RowLockGuard};
use crate::config::DocketConfig;
use crate::core::{DocketError, Result, StoreError};
use crate::transaction::{TransactionId, TransactionState};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

/// Committed contents of one table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub(crate) next_id: i64,
    pub(crate) rows: BTreeMap<RowKey, Row>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&RowKey, &Row)> {
        self.rows.iter()
    }

    fn apply(&mut self, key: RowKey, row: Option<Row>) {
        match row {
            Some(row) => {
                if let RowKey::Id(id) = key {
                    self.next_id = self.next_id.max(id);
                }
                self.rows.insert(key, row);
            }
            None => {
                self.rows.remove(&key);
            }
        }
    }
}

pub(crate) struct StoreInner {
    pub(crate) tables: RwLock<HashMap<String, Table>>,
    locks: LockTable,
    lock_timeout: Option<Duration>,
}

/// In-process implementation of the transactional store.
///
/// Reads see committed data plus the reading transaction's own pending
/// writes. Writes are buffered per transaction and applied in one step at
/// commit, after which the transaction's row locks are released.
#[derive(Clone)]
pub struct MemoryStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(None)
    }

    pub fn with_config(config: &DocketConfig) -> Self {
        Self::with_lock_timeout(config.lock_timeout)
    }

    pub fn with_lock_timeout(lock_timeout: Option<Duration>) -> Self {
        Self::from_tables(HashMap::new(), lock_timeout)
    }

    pub(crate) fn from_tables(tables: HashMap<String, Table>, lock_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                tables: RwLock::new(tables),
                locks: LockTable::new(),
                lock_timeout,
            }),
        }
    }

    pub async fn row_count(&self, table: &str) -> usize {
        let tables = self.inner.tables.read().await;
        tables.get(table).map_or(0, Table::row_count)
    }

    /// Rows with a lock slot; zero once every transaction has finished.
    pub fn locked_rows(&self) -> usize {
        self.inner.locks.slot_count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let id = TransactionId::new();
        debug!(txn = %id, "begin");
        Ok(MemoryTransaction {
            id,
            state: TransactionState::Active,
            store: Arc::clone(&self.inner),
            writes: BTreeMap::new(),
            held: HashMap::new(),
        })
    }
}

type WriteKey = (String, RowKey);

pub struct MemoryTransaction {
    id: TransactionId,
    state: TransactionState,
    store: Arc<StoreInner>,
    /// Pending writes; `None` marks a deletion.
    writes: BTreeMap<WriteKey, Option<Row>>,
    held: HashMap<LockKey, RowLockGuard>,
}

impl MemoryTransaction {
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.state.is_active() {
            return Err(DocketError::Store(StoreError::TransactionClosed(format!(
                "{} ({})",
                self.id, self.state
            ))));
        }
        Ok(())
    }

    async fn lock_row(&mut self, table: &str, key: &RowKey) -> Result<()> {
        let lock_key = LockKey::new(table, key);
        if self.held.contains_key(&lock_key) {
            return Ok(());
        }

        trace!(txn = %self.id, table, key = %key, "waiting for row lock");
        let guard = self
            .store
            .locks
            .acquire(&lock_key, self.store.lock_timeout)
            .await?;
        trace!(txn = %self.id, table, key = %key, "row lock acquired");
        self.held.insert(lock_key, guard);
        Ok(())
    }

    async fn visible(&self, table: &str, key: &RowKey) -> Option<Row> {
        if let Some(pending) = self.writes.get(&(table.to_string(), key.clone())) {
            return pending.clone();
        }
        let tables = self.store.tables.read().await;
        tables.get(table).and_then(|t| t.rows.get(key).cloned())
    }

    fn release(&mut self) {
        let store = Arc::clone(&self.store);
        for (key, guard) in self.held.drain() {
            drop(guard);
            if let Err(err) = store.locks.prune(&key) {
                warn!(txn = %self.id, error = %err, "failed to prune lock slot");
            }
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    async fn fetch(&mut self, table: &str, key: &RowKey) -> Result<Option<Row>> {
        self.ensure_active()?;
        Ok(self.visible(table, key).await)
    }

    async fn fetch_for_update(&mut self, table: &str, key: &RowKey) -> Result<Option<Row>> {
        self.ensure_active()?;
        self.lock_row(table, key).await?;
        Ok(self.visible(table, key).await)
    }

    async fn scan(&mut self, table: &str) -> Result<Vec<(RowKey, Row)>> {
        self.ensure_active()?;
        let mut rows: BTreeMap<RowKey, Row> = {
            let tables = self.store.tables.read().await;
            tables
                .get(table)
                .map(|t| t.rows.clone())
                .unwrap_or_default()
        };

        for ((write_table, key), pending) in &self.writes {
            if write_table != table {
                continue;
            }
            match pending {
                Some(row) => {
                    rows.insert(key.clone(), row.clone());
                }
                None => {
                    rows.remove(key);
                }
            }
        }

        Ok(rows.into_iter().collect())
    }

    async fn allocate_id(&mut self, table: &str) -> Result<i64> {
        self.ensure_active()?;
        let mut tables = self.store.tables.write().await;
        let entry = tables.entry(table.to_string()).or_default();
        entry.next_id += 1;
        Ok(entry.next_id)
    }

    async fn insert(&mut self, table: &str, key: RowKey, row: Row) -> Result<()> {
        self.ensure_active()?;
        self.lock_row(table, &key).await?;
        if self.visible(table, &key).await.is_some() {
            return Err(DocketError::Store(StoreError::DuplicateKey {
                table: table.to_string(),
                key: key.to_string(),
            }));
        }
        self.writes.insert((table.to_string(), key), Some(row));
        Ok(())
    }

    async fn update(&mut self, table: &str, key: &RowKey, row: Row) -> Result<u64> {
        self.ensure_active()?;
        self.lock_row(table, key).await?;
        if self.visible(table, key).await.is_none() {
            return Ok(0);
        }
        self.writes.insert((table.to_string(), key.clone()), Some(row));
        Ok(1)
    }

    async fn delete(&mut self, table: &str, key: &RowKey) -> Result<u64> {
        self.ensure_active()?;
        self.lock_row(table, key).await?;
        if self.visible(table, key).await.is_none() {
            return Ok(0);
        }
        self.writes.insert((table.to_string(), key.clone()), None);
        Ok(1)
    }

    async fn commit(mut self) -> Result<()> {
        self.ensure_active()?;
        let writes = std::mem::take(&mut self.writes);
        let write_count = writes.len();
        {
            let mut tables = self.store.tables.write().await;
            for ((table, key), row) in writes {
                tables.entry(table).or_default().apply(key, row);
            }
        }
        self.state = TransactionState::Committed;
        self.release();
        debug!(txn = %self.id, writes = write_count, "commit");
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        self.ensure_active()?;
        let discarded = self.writes.len();
        self.writes.clear();
        self.state = TransactionState::Aborted;
        self.release();
        debug!(txn = %self.id, discarded, "rollback");
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.state.is_active() {
            warn!(
                txn = %self.id,
                discarded = self.pending_writes(),
                "transaction dropped while active; rolling back"
            );
            self.writes.clear();
            self.state = TransactionState::Aborted;
            self.release();
        }
    }
}
