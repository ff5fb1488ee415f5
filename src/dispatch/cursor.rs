//! Persisted dispatcher cursor.
//!
//! Two string-valued keys, `checkpointTimestamp` and `budgetRemaining`,
//! written together after every run that relayed at least one call.

use crate::error::StorageError;
use crate::types::{Gas, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const CHECKPOINT_KEY: &str = "checkpointTimestamp";
pub const BUDGET_KEY: &str = "budgetRemaining";

/// String key/value storage owned by the dispatcher
pub trait CursorStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write all pairs atomically
    fn put_all(&self, pairs: &[(&str, String)]) -> Result<(), StorageError>;
}

/// Checkpoint and remaining budget carried between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCursor {
    pub checkpoint: Timestamp,
    pub budget_remaining: Gas,
}

impl DispatchCursor {
    /// State assumed on the very first run
    pub fn initial(full_allowance: Gas) -> Self {
        Self {
            checkpoint: 0,
            budget_remaining: full_allowance,
        }
    }

    /// Load the persisted cursor, or `None` if nothing was ever written.
    ///
    /// Each key falls back to its initial value independently.
    pub fn load(store: &dyn CursorStore) -> Result<Option<Self>, StorageError> {
        let checkpoint = read_u64(store, CHECKPOINT_KEY)?;
        let budget = read_u64(store, BUDGET_KEY)?;
        match (checkpoint, budget) {
            (None, None) => Ok(None),
            (checkpoint, budget) => Ok(Some(Self {
                checkpoint: checkpoint.unwrap_or(0),
                budget_remaining: budget.unwrap_or(Gas::MAX),
            })),
        }
    }

    /// Load the persisted cursor, defaulting to [`DispatchCursor::initial`]
    pub fn load_or_initial(store: &dyn CursorStore, full_allowance: Gas) -> Result<Self, StorageError> {
        let mut cursor = Self::load(store)?.unwrap_or_else(|| Self::initial(full_allowance));
        cursor.budget_remaining = cursor.budget_remaining.min(full_allowance);
        Ok(cursor)
    }

    pub fn save(&self, store: &dyn CursorStore) -> Result<(), StorageError> {
        store.put_all(&[
            (CHECKPOINT_KEY, self.checkpoint.to_string()),
            (BUDGET_KEY, self.budget_remaining.to_string()),
        ])
    }
}

fn read_u64(store: &dyn CursorStore, key: &str) -> Result<Option<u64>, StorageError> {
    match store.get(key)? {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| StorageError::Corrupt {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

/// Sled-backed cursor store
pub struct SledCursorStore {
    db: sled::Db,
}

impl SledCursorStore {
    /// Open (or create) the store at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Ok(Self { db })
    }
}

impl CursorStore for SledCursorStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.db.get(key.as_bytes())? {
            Some(value) => String::from_utf8(value.to_vec())
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    value: format!("{:?}", e.as_bytes()),
                }),
            None => Ok(None),
        }
    }

    fn put_all(&self, pairs: &[(&str, String)]) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();
        for (key, value) in pairs {
            batch.insert(key.as_bytes(), value.as_bytes());
        }
        self.db.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }
}

/// In-memory cursor store
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored pair
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.read().clone()
    }
}

impl CursorStore for MemoryCursorStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn put_all(&self, pairs: &[(&str, String)]) -> Result<(), StorageError> {
        let mut values = self.values.write();
        for (key, value) in pairs {
            values.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}
