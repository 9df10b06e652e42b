//! Snapshot persistence for `MemoryStore`.
//!
//! Only committed data is captured. Snapshots are written to a temporary
//! file in the target directory and renamed into place, so a reader never
//! observes a half-written file.

use super::engine::{Row, RowKey};
use super::memory::{MemoryStore, Table};
use crate::core::{DocketError, Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::info;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub tables: Vec<TableSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    pub next_id: i64,
    pub rows: Vec<StoredRow>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoredRow {
    pub key: RowKey,
    pub row: Row,
}

impl StoreSnapshot {
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}

impl MemoryStore {
    /// Capture all committed tables.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let tables = self.inner.tables.read().await;
        let mut snapshots: Vec<TableSnapshot> = tables
            .iter()
            .map(|(name, table)| TableSnapshot {
                name: name.clone(),
                next_id: table.next_id,
                rows: table
                    .rows()
                    .map(|(key, row)| StoredRow {
                        key: key.clone(),
                        row: row.clone(),
                    })
                    .collect(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));

        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            tables: snapshots,
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot, lock_timeout: Option<Duration>) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(DocketError::Store(StoreError::Serialization(format!(
                "unsupported snapshot version {}",
                snapshot.version
            ))));
        }

        let mut tables = HashMap::new();
        for table in snapshot.tables {
            let mut restored = Table {
                next_id: table.next_id,
                ..Table::default()
            };
            for stored in table.rows {
                restored.rows.insert(stored.key, stored.row);
            }
            tables.insert(table.name, restored);
        }

        Ok(Self::from_tables(tables, lock_timeout))
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot().await;
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(path)
            .map_err(|e| DocketError::Store(StoreError::Io(e.error.to_string())))?;

        info!(path = %path.display(), rows = snapshot.row_count(), "snapshot saved");
        Ok(())
    }

    /// Load a snapshot, or start empty when `path` does not exist yet.
    pub fn load_or_empty(path: &Path, lock_timeout: Option<Duration>) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::with_lock_timeout(lock_timeout));
        }

        let bytes = fs::read(path)?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
        info!(path = %path.display(), rows = snapshot.row_count(), "snapshot loaded");
        Self::from_snapshot(snapshot, lock_timeout)
    }
}
