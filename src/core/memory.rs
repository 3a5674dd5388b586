//! In-memory store backend.
//!
//! Metric stores commonly run on this backend. It is never a migration
//! target: process-local records have no durable keys to rewrite.

use crate::core::backend::{BackendKind, StoreBackend};
use crate::core::error::RestampError;
use crate::core::key::RecordKey;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<BTreeMap<RecordKey, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn list_keys(&self) -> Result<Vec<RecordKey>, RestampError> {
        Ok(self.records.lock().unwrap().keys().cloned().collect())
    }

    fn get(&self, key: &RecordKey) -> Result<Vec<u8>, RestampError> {
        self.records
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| RestampError::KeyNotFound(key.to_string()))
    }

    fn set(&self, key: &RecordKey, value: &[u8]) -> Result<(), RestampError> {
        self.records
            .lock()
            .unwrap()
            .insert(key.clone(), value.to_vec());
        Ok(())
    }

    fn remove_key(&self, key: &RecordKey) -> Result<(), RestampError> {
        self.records.lock().unwrap().remove(key);
        Ok(())
    }

    fn move_key(&self, src: &RecordKey, dest: &RecordKey) -> Result<(), RestampError> {
        let mut records = self.records.lock().unwrap();
        let value = records
            .remove(src)
            .ok_or_else(|| RestampError::KeyNotFound(src.to_string()))?;
        records.insert(dest.clone(), value);
        Ok(())
    }

    fn url_for_key(&self, key: &RecordKey) -> Result<String, RestampError> {
        if !self.records.lock().unwrap().contains_key(key) {
            return Err(RestampError::KeyNotFound(key.to_string()));
        }
        Ok(format!("memory://{}", key))
    }

    fn provenance_time(&self, _key: &RecordKey) -> Result<DateTime<Utc>, RestampError> {
        Err(RestampError::Unsupported(
            "in-memory records carry no provenance timestamp".to_string(),
        ))
    }
}
