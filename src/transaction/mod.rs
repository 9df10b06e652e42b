// ============================================================================
// Transaction Management Module
// ============================================================================
//
// Transactions are owned by the storage collaborator. This module holds the
// identifiers and lifecycle states shared by store implementations, plus a
// scoped helper that guarantees rollback on every failing exit path.
//
// ============================================================================

pub mod scope;
pub mod state;

pub use scope::run_in_transaction;
pub use state::{TransactionId, TransactionState};
