//! Restamp: a one-time key migration for record stores.
//!
//! Validation runs used to be addressed by run name alone. Restamp rewrites
//! every record key to embed a resolved run time next to the run name, and
//! updates each record's embedded run identification to match, so runs sort
//! chronologically and name collisions across days disappear.
//!
//! # Migration Model
//!
//! - **Classify once**: every registered store and documentation site is
//!   classified at session start into migratable, database-backed (manual
//!   handling), or unsupported. Skips are informational, never errors.
//! - **Resolve once per run**: a run identifier resolves to one canonical
//!   ISO-8601 run time, by parsing the identifier itself or falling back to
//!   backend provenance (file mtime, object last-modified, blob created
//!   time). Resolutions are memoized for the whole session, so duplicate
//!   runs across stores and sites collapse to one consistent time.
//! - **Isolate failures**: each key is migrated independently. One bad key
//!   never aborts the batch; a backend whose listing fails is abandoned
//!   with a single logged exception; the session always returns its log.
//! - **Forward only**: there is no rollback. The upgrade log is the audit
//!   trail and the recovery tool.
//!
//! # Crate Structure
//!
//! - [`core`]: backend capability and adapters, resolver, checklist,
//!   engine, upgrade log
//! - [`cli`]: the `restamp` command-line surface (`preflight`, `run`)

pub mod cli;
pub mod core;
