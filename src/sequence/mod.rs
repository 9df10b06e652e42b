// ============================================================================
// Document Numbering
// ============================================================================
//
// Formatter -> Store -> Service. The store's read-increment-write runs under
// the module row's exclusive lock inside the caller's transaction; the
// service renders the reserved value and leaves commit to the caller.
//
// ============================================================================

pub mod definition;
pub mod format;
pub mod service;
pub mod store;

pub use definition::{SEQUENCE_TABLE, SequenceDefinition};
pub use format::{Template, format_number};
pub use service::SequenceService;
pub use store::SequenceStore;
