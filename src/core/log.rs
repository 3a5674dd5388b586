//! Upgrade log: the structured, replayable record of one migration session.
//!
//! The log is a passive structure. The checklist builder and the migration
//! engine append to it synchronously; it is initialized empty at session
//! start, owned by exactly one session, and returned as the session's final
//! and only artifact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity a backend is migrated under: a validation store name or a
/// documentation site name. Exactly one applies to any backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Store(String),
    Site(String),
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Store(name) | Target::Site(name) => name,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Store(name) => write!(f, "store {}", name),
            Target::Site(name) => write!(f, "site {}", name),
        }
    }
}

/// One store or site recorded as skipped, with its backend kind label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub name: String,
    pub backend_kind: String,
}

/// Skip buckets for stores: manual-handling (database) and unrecognized.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStores {
    pub database: Vec<SkippedEntry>,
    pub unsupported: Vec<SkippedEntry>,
}

/// Skip bucket for documentation sites; site backends have no database
/// bucket by convention.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSites {
    pub unsupported: Vec<SkippedEntry>,
}

/// One successfully relocated key, as location strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMove {
    pub src: String,
    pub dest: String,
}

/// Per-store/per-site migration outcome.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOutcome {
    pub updated: Vec<KeyMove>,
    pub had_exceptions: bool,
}

/// One failure, scoped to a key or to a whole backend (`src`/`dest` are
/// `"N/A"` when unknown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub target: Target,
    pub src: String,
    pub dest: String,
    pub message: String,
}

/// Pre-migration skip summary used by the confirmation prompt.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipSummary {
    pub stores_with_database_backends: Vec<String>,
    pub stores_with_unsupported_backends: Vec<String>,
    pub docs_sites_with_unsupported_backends: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeLog {
    pub skipped_validations_stores: SkippedStores,
    pub skipped_docs_sites: SkippedSites,
    pub skipped_metrics_stores: SkippedStores,
    pub exceptions: Vec<ExceptionRecord>,
    pub upgraded_validations_stores: BTreeMap<String, StoreOutcome>,
    pub upgraded_docs_sites: BTreeMap<String, StoreOutcome>,
}

impl UpgradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_validations_database(&mut self, name: &str, backend_kind: &str) {
        self.skipped_validations_stores
            .database
            .push(skipped(name, backend_kind));
    }

    pub fn skip_validations_unsupported(&mut self, name: &str, backend_kind: &str) {
        self.skipped_validations_stores
            .unsupported
            .push(skipped(name, backend_kind));
    }

    pub fn skip_metrics_database(&mut self, name: &str, backend_kind: &str) {
        self.skipped_metrics_stores
            .database
            .push(skipped(name, backend_kind));
    }

    pub fn skip_metrics_unsupported(&mut self, name: &str, backend_kind: &str) {
        self.skipped_metrics_stores
            .unsupported
            .push(skipped(name, backend_kind));
    }

    pub fn skip_site_unsupported(&mut self, name: &str, backend_kind: &str) {
        self.skipped_docs_sites
            .unsupported
            .push(skipped(name, backend_kind));
    }

    /// Register an (empty) outcome for a target about to be migrated.
    pub fn start_outcome(&mut self, target: &Target) {
        self.outcomes_for_mut(target)
            .entry(target.name().to_string())
            .or_default();
    }

    pub fn record_updated(&mut self, target: &Target, src: String, dest: String) {
        self.outcomes_for_mut(target)
            .entry(target.name().to_string())
            .or_default()
            .updated
            .push(KeyMove { src, dest });
    }

    pub fn record_exception(&mut self, target: &Target, src: String, dest: String, message: String) {
        self.outcomes_for_mut(target)
            .entry(target.name().to_string())
            .or_default()
            .had_exceptions = true;
        self.exceptions.push(ExceptionRecord {
            target: target.clone(),
            src,
            dest,
            message,
        });
    }

    pub fn outcome(&self, target: &Target) -> Option<&StoreOutcome> {
        match target {
            Target::Store(name) => self.upgraded_validations_stores.get(name),
            Target::Site(name) => self.upgraded_docs_sites.get(name),
        }
    }

    fn outcomes_for_mut(&mut self, target: &Target) -> &mut BTreeMap<String, StoreOutcome> {
        match target {
            Target::Store(_) => &mut self.upgraded_validations_stores,
            Target::Site(_) => &mut self.upgraded_docs_sites,
        }
    }

    /// Names needing manual handling, for the pre-migration summary.
    pub fn summarize(&self) -> SkipSummary {
        let mut stores_with_database_backends: Vec<String> = self
            .skipped_validations_stores
            .database
            .iter()
            .chain(self.skipped_metrics_stores.database.iter())
            .map(|entry| entry.name.clone())
            .collect();
        stores_with_database_backends.sort();

        let mut stores_with_unsupported_backends: Vec<String> = self
            .skipped_validations_stores
            .unsupported
            .iter()
            .chain(self.skipped_metrics_stores.unsupported.iter())
            .map(|entry| entry.name.clone())
            .collect();
        stores_with_unsupported_backends.sort();

        let docs_sites_with_unsupported_backends = self
            .skipped_docs_sites
            .unsupported
            .iter()
            .map(|entry| entry.name.clone())
            .collect();

        SkipSummary {
            stores_with_database_backends,
            stores_with_unsupported_backends,
            docs_sites_with_unsupported_backends,
        }
    }
}

fn skipped(name: &str, backend_kind: &str) -> SkippedEntry {
    SkippedEntry {
        name: name.to_string(),
        backend_kind: backend_kind.to_string(),
    }
}
