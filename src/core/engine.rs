//! Migration engine: one session that rewrites record keys to embed
//! resolved run times.
//!
//! A session classifies every registered store and site once, then runs two
//! passes: validation stores (content rewrite) and documentation sites
//! (relocation only). Failures are isolated per key; a listing failure is
//! the only thing that aborts a backend; nothing aborts the session. The
//! caller always gets the upgrade log back.

use crate::core::backend::StoreBackend;
use crate::core::checklist::{self, Checklist};
use crate::core::config::SiteConfig;
use crate::core::error::RestampError;
use crate::core::key::RecordKey;
use crate::core::log::{Target, UpgradeLog};
use crate::core::registry::StoreRegistry;
use crate::core::resolver::RunTimeResolver;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// How a single record transfer ended.
enum Transfer {
    Done,
    /// The record already carries structured run identification; partial
    /// re-runs must leave it untouched.
    AlreadyStamped,
}

pub struct UpgradeSession {
    checklist: Checklist,
    resolver: RunTimeResolver,
    log: UpgradeLog,
}

impl UpgradeSession {
    /// Classify every store and site and prepare an empty log.
    ///
    /// Classification happens exactly once per session; it is never
    /// re-evaluated mid-run.
    pub fn new(
        stores: &StoreRegistry,
        sites: &BTreeMap<String, SiteConfig>,
    ) -> Result<Self, RestampError> {
        let mut log = UpgradeLog::new();
        let checklist = checklist::build(stores, sites, &mut log)?;
        Ok(Self {
            checklist,
            resolver: RunTimeResolver::new(),
            log,
        })
    }

    pub fn checklist(&self) -> &Checklist {
        &self.checklist
    }

    pub fn log(&self) -> &UpgradeLog {
        &self.log
    }

    /// Human-readable confirmation text: what will be migrated, and what
    /// must be handled by hand.
    pub fn preflight_summary(&self) -> String {
        let summary = self.log.summarize();
        let stores = joined_or_none(self.checklist.validations.keys());
        let sites = joined_or_none(self.checklist.docs_sites.keys());

        format!(
            "\
WARNING: this upgrade rewrites record keys in place and cannot be rolled
back. Make sure you have a backup of your project before proceeding.

The following stores and documentation sites will be upgraded:
  - Validation stores: {}
  - Documentation sites: {}

The following must be migrated by hand, because they use a database backend
or a backend kind this tool does not recognize:
  - Stores with database backends: {}
  - Stores with unsupported backends: {}
  - Documentation sites with unsupported backends: {}
",
            stores,
            sites,
            joined_or_none(summary.stores_with_database_backends.iter()),
            joined_or_none(summary.stores_with_unsupported_backends.iter()),
            joined_or_none(summary.docs_sites_with_unsupported_backends.iter()),
        )
    }

    /// Run both migration passes and return the log.
    ///
    /// The two passes are wrapped independently: a backend implementation
    /// that panics cannot prevent the other pass from running or the log
    /// from being returned. Per-key logging has already captured every
    /// failure cause, so the boundary records nothing further.
    pub fn run(mut self) -> UpgradeLog {
        let stores: Vec<(String, Arc<dyn StoreBackend>)> = self
            .checklist
            .validations
            .iter()
            .map(|(name, backend)| (name.clone(), backend.clone()))
            .collect();
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            for (name, backend) in &stores {
                let target = Target::Store(name.clone());
                self.log.start_outcome(&target);
                self.migrate_backend(backend.as_ref(), &target);
            }
        }));

        let sites: Vec<(String, Arc<dyn StoreBackend>)> = self
            .checklist
            .docs_sites
            .iter()
            .map(|(name, backend)| (name.clone(), backend.clone()))
            .collect();
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            for (name, backend) in &sites {
                let target = Target::Site(name.clone());
                self.log.start_outcome(&target);
                self.migrate_backend(backend.as_ref(), &target);
            }
        }));

        self.log
    }

    /// Migrate every key of one backend, isolating failures per key.
    fn migrate_backend(&mut self, backend: &dyn StoreBackend, target: &Target) {
        let source_keys = match backend.list_keys() {
            Ok(keys) => keys,
            Err(err) => {
                self.log.record_exception(
                    target,
                    "N/A".to_string(),
                    "N/A".to_string(),
                    format!("listing keys failed: {}", err),
                );
                return;
            }
        };

        for source_key in source_keys {
            let run_name = match source_key.run_id() {
                Ok(run_name) => run_name.to_string(),
                Err(err) => {
                    self.record_key_exception(
                        backend,
                        target,
                        Some(&source_key),
                        None,
                        &err.to_string(),
                    );
                    continue;
                }
            };

            let run_time = match self.resolver.resolve(&run_name, &source_key, backend) {
                Ok(run_time) => run_time,
                Err(err) => {
                    // Destination key is never computed for this key.
                    self.record_key_exception(
                        backend,
                        target,
                        Some(&source_key),
                        None,
                        &format!("resolving run time for {:?} failed: {}", run_name, err),
                    );
                    continue;
                }
            };

            let dest_key = source_key.with_run_time(&run_time);
            // The source location must be captured before the transfer
            // deletes the source key.
            let src = location_for(backend, &source_key);
            let transfer = match target {
                Target::Store(_) => {
                    rewrite_record(backend, &source_key, &dest_key, &run_name, &run_time)
                }
                Target::Site(_) => backend
                    .move_key(&source_key, &dest_key)
                    .map(|_| Transfer::Done),
            };

            match transfer {
                Ok(Transfer::AlreadyStamped) => {}
                Ok(Transfer::Done) => {
                    let dest = location_for(backend, &dest_key);
                    self.log.record_updated(target, src, dest);
                }
                Err(err) => {
                    self.record_key_exception(
                        backend,
                        target,
                        Some(&source_key),
                        Some(&dest_key),
                        &err.to_string(),
                    );
                }
            }
        }
    }

    fn record_key_exception(
        &mut self,
        backend: &dyn StoreBackend,
        target: &Target,
        source_key: Option<&RecordKey>,
        dest_key: Option<&RecordKey>,
        message: &str,
    ) {
        let src = source_key
            .map(|key| location_for(backend, key))
            .unwrap_or_else(|| "N/A".to_string());
        let dest = dest_key
            .map(|key| location_for(backend, key))
            .unwrap_or_else(|| "N/A".to_string());
        self.log
            .record_exception(target, src, dest, message.to_string());
    }
}

/// Best-effort location string; URL resolution failures never cascade.
fn location_for(backend: &dyn StoreBackend, key: &RecordKey) -> String {
    backend
        .url_for_key(key)
        .unwrap_or_else(|_| format!("unable to resolve location for key: {}", key))
}

/// Rewrite one validation record under its destination key.
///
/// Not an atomic rename: a crash between the destination write and the
/// source delete leaves both copies present. Source removal is idempotent
/// and duplicate destination writes overwrite with identical content, so
/// retrying is safe.
fn rewrite_record(
    backend: &dyn StoreBackend,
    source_key: &RecordKey,
    dest_key: &RecordKey,
    run_name: &str,
    run_time: &str,
) -> Result<Transfer, RestampError> {
    let raw = backend.get(source_key)?;
    let mut record: Value = serde_json::from_slice(&raw)?;
    let meta = record
        .get_mut("meta")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            RestampError::MalformedRecord(format!("record {} has no meta object", source_key))
        })?;

    if meta.get("run_id").is_some_and(Value::is_object) {
        return Ok(Transfer::AlreadyStamped);
    }

    meta.insert(
        "run_id".to_string(),
        json!({ "run_name": run_name, "run_time": run_time }),
    );
    backend.set(dest_key, &serde_json::to_vec(&record)?)?;
    backend.remove_key(source_key)?;
    Ok(Transfer::Done)
}

fn joined_or_none<'a, I>(names: I) -> String
where
    I: Iterator<Item = &'a String>,
{
    let joined = names.cloned().collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "None".to_string()
    } else {
        joined
    }
}
