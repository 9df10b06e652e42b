use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type EntityId = i64;

pub type Timestamp = DateTime<Utc>;

/// The zero-epoch date used as the "absent" timestamp.
pub fn epoch() -> Timestamp {
    Timestamp::default()
}

/// Audit columns carried by every persisted row.
///
/// `created_*` are written once at insert. `modified_*` are written only
/// when an update actually changes the row; `modified_at` doubles as the
/// optimistic concurrency token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    pub created_by: String,
    pub created_at: Timestamp,
    pub modified_by: String,
    pub modified_at: Timestamp,
}

impl AuditFields {
    pub fn created(actor: &str, at: Timestamp) -> Self {
        Self {
            created_by: actor.to_string(),
            created_at: at,
            modified_by: actor.to_string(),
            modified_at: at,
        }
    }

    /// Audit fields carrying only a concurrency token, as sent by an editor
    /// that last saw the row at `modified_at`.
    pub fn token(modified_at: Timestamp) -> Self {
        Self {
            modified_at,
            ..Self::default()
        }
    }

    /// Stamp a confirmed modification.
    ///
    /// The new stamp is strictly greater than the previous one, so two
    /// consecutive writes never share a concurrency token even when the
    /// clock does not advance between them.
    pub fn stamp_modified(&mut self, actor: &str, now: Timestamp) {
        let floor = self.modified_at + Duration::microseconds(1);
        self.modified_by = actor.to_string();
        self.modified_at = now.max(floor);
    }
}

impl Default for AuditFields {
    fn default() -> Self {
        Self {
            created_by: String::new(),
            created_at: epoch(),
            modified_by: String::new(),
            modified_at: epoch(),
        }
    }
}
