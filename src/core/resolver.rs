//! Run-time resolution: one canonical timestamp per run identifier.
//!
//! Resolution is layered: parse the identifier itself first, fall back to
//! backend provenance. Results are memoized for the whole session, so every
//! key sharing a run identifier receives the identical resolved time
//! regardless of which store or site it lives in, and each distinct
//! identifier costs at most one backend metadata fetch.

use crate::core::backend::StoreBackend;
use crate::core::error::RestampError;
use crate::core::key::RecordKey;
use crate::core::time;
use std::collections::HashMap;

#[derive(Default)]
pub struct RunTimeResolver {
    run_times: HashMap<String, String>,
}

impl RunTimeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `run_id` to an ISO-8601 run time, memoized.
    ///
    /// `key` is a representative record carrying this run identifier on
    /// `backend`; it is only consulted when the identifier does not parse
    /// as a date.
    pub fn resolve(
        &mut self,
        run_id: &str,
        key: &RecordKey,
        backend: &dyn StoreBackend,
    ) -> Result<String, RestampError> {
        if let Some(cached) = self.run_times.get(run_id) {
            return Ok(cached.clone());
        }
        let resolved = match time::parse_run_time(run_id) {
            Some(parsed) => parsed,
            None => backend.provenance_time(key)?.to_rfc3339(),
        };
        self.run_times.insert(run_id.to_string(), resolved.clone());
        Ok(resolved)
    }

    pub fn cached(&self, run_id: &str) -> Option<&str> {
        self.run_times.get(run_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.run_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.run_times.is_empty()
    }
}
