// ============================================================================
// Docket Library
// ============================================================================
//
// Document numbering and optimistic-concurrency core for CRUD backends.
//
// - sequence:    template formatting + row-locked per-module counters
// - tracking:    baseline capture / partial merge / dirty detection
// - concurrency: the guarded fetch-for-update -> check -> merge -> write cycle
// - storage:     transactional store interfaces and an in-memory implementation
//
// ============================================================================

extern crate self as docket;

pub mod concurrency;
pub mod config;
pub mod core;
pub mod domain;
pub mod facade;
pub mod repository;
pub mod sequence;
pub mod storage;
pub mod tracking;
pub mod transaction;

pub use concurrency::{UpdateGuard, UpdateOutcome};
pub use config::DocketConfig;
pub use crate::core::{AuditFields, DocketError, EntityId, Result, StoreError, Timestamp};
pub use docket_derive::ChangeTracked;
pub use facade::Docket;
pub use repository::Repository;
pub use sequence::{SequenceDefinition, SequenceService, SequenceStore, Template, format_number};
pub use storage::{MemoryStore, RowKey, StoreTransaction, TransactionalStore};
pub use tracking::{Absent, ChangeTracked, Tracked};
pub use transaction::run_in_transaction;
