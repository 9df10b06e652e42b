pub mod engine;
pub(crate) mod locks;
pub mod memory;
pub mod persistence;

pub use engine::{Row, RowKey, StoreTransaction, TransactionalStore};
pub use memory::{MemoryStore, MemoryTransaction, Table};
pub use persistence::StoreSnapshot;
