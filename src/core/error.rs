use crate::core::types::{EntityId, Timestamp};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocketError {
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },

    #[error(
        "Conflict on {table} #{id}: stored modification {stored} is newer than incoming {incoming}"
    )]
    Conflict {
        table: &'static str,
        id: EntityId,
        stored: Timestamp,
        incoming: Timestamp,
    },

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid sequence definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DocketError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    /// The caller should refresh and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// The record is gone; retrying will not help.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failures raised by the transactional store itself.
///
/// These are opaque to the sequence and update protocols: they are
/// surfaced unchanged and never retried.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Lock wait timeout on {table}/{key} after {waited_ms} ms")]
    LockTimeout {
        table: String,
        key: String,
        waited_ms: u128,
    },

    #[error("Duplicate key {key} in table '{table}'")]
    DuplicateKey { table: String, key: String },

    #[error("Transaction {0} is no longer active")]
    TransactionClosed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

pub type Result<T> = std::result::Result<T, DocketError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DocketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(err.into())
    }
}

impl From<std::io::Error> for DocketError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(StoreError::Io(err.to_string()))
    }
}

impl<T> From<std::sync::PoisonError<T>> for DocketError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Store(StoreError::Poisoned(err.to_string()))
    }
}
