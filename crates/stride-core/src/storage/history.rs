//! Persisted list of finished runs.
//!
//! The whole list is one JSON array under a single key; every write
//! replaces it. There is a single writer (the controller), so no merging.

use super::kv::KeyValueStore;
use crate::error::StorageError;
use crate::record::RunRecord;

/// Key the history list is stored under unless configured otherwise.
pub const DEFAULT_HISTORY_KEY: &str = "run_history";

/// Append-only run history on top of a [`KeyValueStore`].
pub struct RunHistoryStore {
    kv: Box<dyn KeyValueStore>,
    key: String,
}

impl RunHistoryStore {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, DEFAULT_HISTORY_KEY)
    }

    pub fn with_key(kv: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// All records in insertion order.
    ///
    /// # Errors
    /// Returns an error if the store fails or the stored list is malformed.
    pub fn load(&self) -> Result<Vec<RunRecord>, StorageError> {
        match self.kv.get(&self.key)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Add one record and persist the full list.
    ///
    /// # Errors
    /// Returns an error if the existing list cannot be read or the new list
    /// cannot be written. A malformed list is never overwritten.
    pub fn append(&self, record: &RunRecord) -> Result<(), StorageError> {
        let mut records = self.load()?;
        records.push(record.clone());
        self.save_all(&records)
    }

    pub fn get(&self, run_id: &str) -> Result<Option<RunRecord>, StorageError> {
        Ok(self.load()?.into_iter().find(|r| r.id == run_id))
    }

    /// Remove one record, returning it.
    ///
    /// # Errors
    /// `RunNotFound` if no record has this id.
    pub fn delete(&self, run_id: &str) -> Result<RunRecord, StorageError> {
        let mut records = self.load()?;
        let index = records
            .iter()
            .position(|r| r.id == run_id)
            .ok_or_else(|| StorageError::RunNotFound(run_id.to_string()))?;
        let removed = records.remove(index);
        self.save_all(&records)?;
        Ok(removed)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.kv.remove(&self.key)
    }

    fn save_all(&self, records: &[RunRecord]) -> Result<(), StorageError> {
        let json = serde_json::to_string(records)?;
        self.kv.set(&self.key, &json)
    }
}
