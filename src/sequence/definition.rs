use crate::core::AuditFields;
use serde::{Deserialize, Serialize};

pub const SEQUENCE_TABLE: &str = "sequence_definitions";

/// One numbering series: the counter and template for a module.
///
/// `last_number` is the most recently issued value; it never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    pub module: String,
    pub template: String,
    pub last_number: u64,
    pub audit: AuditFields,
}

impl SequenceDefinition {
    pub fn next_number(&self) -> Option<u64> {
        self.last_number.checked_add(1)
    }
}
