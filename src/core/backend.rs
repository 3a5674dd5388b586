//! Store backend capability: the closed set of storage media a record
//! store can live on, and the operations the migration engine needs.
//!
//! Backend kinds form a finite, closed set. Classification and the
//! run-time resolver switch on [`BackendKind`]; medium-specific behavior
//! (key to physical location mapping, provenance timestamps) lives in each
//! adapter behind [`StoreBackend`].

use crate::core::error::RestampError;
use crate::core::key::RecordKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage medium discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Records are files under a local root directory.
    Filesystem,
    /// Object-storage variant A; provenance is the object's last-modified time.
    S3,
    /// Object-storage variant B; provenance is the blob's created time.
    Gcs,
    /// Relational-database-backed; never migrated automatically.
    Database,
    /// Process-local map; metric stores only.
    Memory,
}

impl BackendKind {
    /// Stable lowercase label used in skip records and reports.
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Filesystem => "filesystem",
            BackendKind::S3 => "s3",
            BackendKind::Gcs => "gcs",
            BackendKind::Database => "database",
            BackendKind::Memory => "memory",
        }
    }

    /// Whether the migration engine can rewrite keys on this medium.
    pub fn is_migratable(&self) -> bool {
        matches!(
            self,
            BackendKind::Filesystem | BackendKind::S3 | BackendKind::Gcs
        )
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Key-addressed store operations, implemented per storage medium.
///
/// Removing an absent key is a no-op: source removal must be safe to retry
/// after a crash between the destination write and the source delete.
pub trait StoreBackend {
    fn kind(&self) -> BackendKind;

    fn list_keys(&self) -> Result<Vec<RecordKey>, RestampError>;

    fn get(&self, key: &RecordKey) -> Result<Vec<u8>, RestampError>;

    fn set(&self, key: &RecordKey, value: &[u8]) -> Result<(), RestampError>;

    fn remove_key(&self, key: &RecordKey) -> Result<(), RestampError>;

    /// Relocate a value without touching its content.
    fn move_key(&self, src: &RecordKey, dest: &RecordKey) -> Result<(), RestampError>;

    /// Human-readable location of a key. Fails if the key is absent or the
    /// backend is unreachable.
    fn url_for_key(&self, key: &RecordKey) -> Result<String, RestampError>;

    /// Medium-specific fallback timestamp for a record whose run identifier
    /// is not itself a date: file mtime, object last-modified, blob created
    /// time. Media without provenance report `Unsupported`.
    fn provenance_time(&self, key: &RecordKey) -> Result<DateTime<Utc>, RestampError>;
}
