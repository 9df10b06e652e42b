use crate::core::Result;
use crate::transaction::TransactionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored row. Entities are serialized to JSON objects.
pub type Row = serde_json::Value;

/// Primary key of a row: an integer identity for entities, a unique
/// name for keyed rows such as sequence definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowKey {
    Id(i64),
    Name(String),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Id(id) => write!(f, "#{id}"),
            RowKey::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl From<i64> for RowKey {
    fn from(id: i64) -> Self {
        RowKey::Id(id)
    }
}

impl From<&str> for RowKey {
    fn from(name: &str) -> Self {
        RowKey::Name(name.to_string())
    }
}

/// Transaction boundary supplied by the storage collaborator.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    type Tx: StoreTransaction;

    async fn begin(&self) -> Result<Self::Tx>;
}

/// Operations available inside one open transaction.
///
/// Writes take an exclusive lock on the affected row that is held until
/// the transaction ends. A transaction dropped without `commit` behaves
/// as if rolled back.
#[async_trait]
pub trait StoreTransaction: Send {
    fn id(&self) -> TransactionId;

    /// Read the committed row, or this transaction's own pending write.
    async fn fetch(&mut self, table: &str, key: &RowKey) -> Result<Option<Row>>;

    /// Like `fetch`, but first acquires the row's exclusive lock.
    ///
    /// Blocks while another transaction holds the lock. A missing row is
    /// still locked, so a concurrent insert under the same key waits too.
    async fn fetch_for_update(&mut self, table: &str, key: &RowKey) -> Result<Option<Row>>;

    /// All visible rows of a table, ordered by key. Takes no locks.
    async fn scan(&mut self, table: &str) -> Result<Vec<(RowKey, Row)>>;

    /// Reserve a fresh integer identity for `table`. Not returned on rollback.
    async fn allocate_id(&mut self, table: &str) -> Result<i64>;

    async fn insert(&mut self, table: &str, key: RowKey, row: Row) -> Result<()>;

    /// Replace a row. Returns the number of rows affected (0 or 1).
    async fn update(&mut self, table: &str, key: &RowKey, row: Row) -> Result<u64>;

    /// Returns the number of rows affected (0 or 1).
    async fn delete(&mut self, table: &str, key: &RowKey) -> Result<u64>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}
