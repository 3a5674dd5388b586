use chrono::{DateTime, Utc};
use restamp::core::backend::StoreBackend;
use restamp::core::config::{BackendConfig, SiteConfig};
use restamp::core::database::DatabaseBackend;
use restamp::core::engine::UpgradeSession;
use restamp::core::filesystem::FilesystemBackend;
use restamp::core::key::RecordKey;
use restamp::core::memory::MemoryBackend;
use restamp::core::registry::{StoreKind, StoreRegistry};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn key(segments: &[&str]) -> RecordKey {
    RecordKey::new(segments.iter().copied()).expect("valid key")
}

fn validation_record(run_name: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "meta": {
            "run_id": run_name,
            "expectation_suite_name": "suite"
        },
        "results": [],
        "success": true,
        "statistics": { "evaluated_expectations": 0 }
    }))
    .expect("serializable record")
}

fn mtime_iso(backend: &FilesystemBackend, key: &RecordKey) -> String {
    let modified = fs::metadata(backend.path_for_key(key))
        .expect("metadata")
        .modified()
        .expect("mtime");
    DateTime::<Utc>::from(modified).to_rfc3339()
}

fn no_sites() -> BTreeMap<String, SiteConfig> {
    BTreeMap::new()
}

#[test]
fn parseable_and_label_run_names_both_migrate() {
    let tmp = tempdir().expect("tempdir");
    let backend = Arc::new(FilesystemBackend::new(tmp.path().join("validations")));

    let parseable = key(&["suite", "20210101T000000", "batch_a.json"]);
    let custom = key(&["suite", "my_custom_run", "batch_b.json"]);
    backend
        .set(&parseable, &validation_record("20210101T000000"))
        .unwrap();
    backend
        .set(&custom, &validation_record("my_custom_run"))
        .unwrap();
    let custom_run_time = mtime_iso(&backend, &custom);

    let mut registry = StoreRegistry::new();
    registry.insert("validations_store", StoreKind::Validations, backend.clone());
    let session = UpgradeSession::new(&registry, &no_sites()).unwrap();
    let log = session.run();

    assert!(log.exceptions.is_empty());
    let outcome = &log.upgraded_validations_stores["validations_store"];
    assert_eq!(outcome.updated.len(), 2);
    assert!(!outcome.had_exceptions);

    // Parseable run name: the name itself is the run time, normalized.
    let dest_parseable = parseable.with_run_time("2021-01-01T00:00:00");
    assert!(backend.get(&dest_parseable).is_ok());
    assert!(backend.get(&parseable).is_err());

    // Label run name: the run time comes from the file's mtime, in UTC.
    let dest_custom = custom.with_run_time(&custom_run_time);
    let rewritten: Value = serde_json::from_slice(&backend.get(&dest_custom).unwrap()).unwrap();
    assert_eq!(rewritten["meta"]["run_id"]["run_name"], "my_custom_run");
    assert_eq!(rewritten["meta"]["run_id"]["run_time"], custom_run_time);
    assert!(backend.get(&custom).is_err());
}

#[test]
fn run_times_are_shared_across_stores() {
    let tmp = tempdir().expect("tempdir");
    let first = Arc::new(FilesystemBackend::new(tmp.path().join("first")));
    let second = Arc::new(FilesystemBackend::new(tmp.path().join("second")));

    let shared = key(&["suite", "shared_run", "batch.json"]);
    first.set(&shared, &validation_record("shared_run")).unwrap();
    second
        .set(&shared, &validation_record("shared_run"))
        .unwrap();
    let first_run_time = mtime_iso(&first, &shared);

    let mut registry = StoreRegistry::new();
    registry.insert("a_validations", StoreKind::Validations, first.clone());
    registry.insert("b_validations", StoreKind::Validations, second.clone());
    let log = UpgradeSession::new(&registry, &no_sites()).unwrap().run();

    assert!(log.exceptions.is_empty());

    // `a_validations` migrates first and resolves the run; `b_validations`
    // must reuse that resolution instead of consulting its own mtimes.
    let first_keys = first.list_keys().unwrap();
    let second_keys = second.list_keys().unwrap();
    assert_eq!(first_keys.len(), 1);
    assert_eq!(second_keys.len(), 1);
    assert_eq!(first_keys[0].segments()[2], first_run_time);
    assert_eq!(second_keys[0].segments()[2], first_run_time);
}

#[test]
fn run_times_are_shared_between_stores_and_sites() {
    let tmp = tempdir().expect("tempdir");
    let store_backend = Arc::new(FilesystemBackend::new(tmp.path().join("validations")));
    let site_root = tmp.path().join("data_docs");
    let site_backend = FilesystemBackend::new(site_root.clone());

    let record_key = key(&["suite", "release_run", "batch.json"]);
    store_backend
        .set(&record_key, &validation_record("release_run"))
        .unwrap();
    let page_key = key(&["suite", "release_run", "batch.html"]);
    site_backend.set(&page_key, b"<html></html>").unwrap();
    let store_run_time = mtime_iso(&store_backend, &record_key);

    let mut registry = StoreRegistry::new();
    registry.insert("validations_store", StoreKind::Validations, store_backend);
    let mut sites = BTreeMap::new();
    sites.insert(
        "local_site".to_string(),
        SiteConfig {
            backend: BackendConfig::Filesystem { root: site_root },
        },
    );

    let log = UpgradeSession::new(&registry, &sites).unwrap().run();
    assert!(log.exceptions.is_empty());

    // The stores pass resolved the run; the sites pass reuses it.
    let moved = site_backend.list_keys().unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].segments()[2], store_run_time);
    assert_eq!(
        site_backend.get(&moved[0]).unwrap(),
        b"<html></html>".to_vec()
    );
}

#[test]
fn database_backed_store_is_skipped_untouched() {
    let tmp = tempdir().expect("tempdir");
    let backend = Arc::new(DatabaseBackend::open(tmp.path().join("validations.db")).unwrap());
    let record_key = key(&["suite", "run_one", "batch.json"]);
    backend
        .set(&record_key, &validation_record("run_one"))
        .unwrap();

    let mut registry = StoreRegistry::new();
    registry.insert("validations_db", StoreKind::Validations, backend.clone());
    let session = UpgradeSession::new(&registry, &no_sites()).unwrap();
    assert!(session.checklist().validations.is_empty());
    let log = session.run();

    assert_eq!(log.skipped_validations_stores.database.len(), 1);
    assert_eq!(
        log.skipped_validations_stores.database[0].name,
        "validations_db"
    );
    assert_eq!(
        log.skipped_validations_stores.database[0].backend_kind,
        "database"
    );
    assert!(log.exceptions.is_empty());
    assert!(!log.upgraded_validations_stores.contains_key("validations_db"));

    // The store content is untouched.
    assert_eq!(backend.list_keys().unwrap(), vec![record_key]);
}

#[test]
fn listing_failure_aborts_only_that_backend() {
    let tmp = tempdir().expect("tempdir");
    let broken = Arc::new(FilesystemBackend::new(tmp.path().join("missing")));
    let healthy = Arc::new(FilesystemBackend::new(tmp.path().join("validations")));
    let record_key = key(&["suite", "20210101T000000", "batch.json"]);
    healthy
        .set(&record_key, &validation_record("20210101T000000"))
        .unwrap();

    let mut registry = StoreRegistry::new();
    registry.insert("broken_store", StoreKind::Validations, broken);
    registry.insert("healthy_store", StoreKind::Validations, healthy.clone());
    let log = UpgradeSession::new(&registry, &no_sites()).unwrap().run();

    // Exactly one backend-scoped exception, with no key locations known.
    assert_eq!(log.exceptions.len(), 1);
    assert_eq!(log.exceptions[0].src, "N/A");
    assert_eq!(log.exceptions[0].dest, "N/A");
    let broken_outcome = &log.upgraded_validations_stores["broken_store"];
    assert!(broken_outcome.updated.is_empty());
    assert!(broken_outcome.had_exceptions);

    // The failure did not stop the other store.
    let healthy_outcome = &log.upgraded_validations_stores["healthy_store"];
    assert_eq!(healthy_outcome.updated.len(), 1);
    assert!(!healthy_outcome.had_exceptions);
}

#[test]
fn every_listed_key_is_accounted_for_exactly_once() {
    let tmp = tempdir().expect("tempdir");
    let backend = Arc::new(FilesystemBackend::new(tmp.path().join("validations")));

    backend
        .set(
            &key(&["suite", "20210101T000000", "batch_a.json"]),
            &validation_record("20210101T000000"),
        )
        .unwrap();
    backend
        .set(
            &key(&["suite", "another_run", "batch_b.json"]),
            &validation_record("another_run"),
        )
        .unwrap();
    // A key with a single segment has no run identifier to extract.
    backend.set(&key(&["orphan.json"]), b"{}").unwrap();
    let listed = backend.list_keys().unwrap().len();

    let mut registry = StoreRegistry::new();
    registry.insert("validations_store", StoreKind::Validations, backend.clone());
    let log = UpgradeSession::new(&registry, &no_sites()).unwrap().run();

    let outcome = &log.upgraded_validations_stores["validations_store"];
    assert_eq!(outcome.updated.len() + log.exceptions.len(), listed);
    assert_eq!(outcome.updated.len(), 2);
    assert_eq!(log.exceptions.len(), 1);
    assert!(outcome.had_exceptions);
    // The bad key is still there, untouched.
    assert!(backend.get(&key(&["orphan.json"])).is_ok());
}

#[test]
fn rerun_after_partial_failure_changes_nothing_migrated() {
    let tmp = tempdir().expect("tempdir");
    let backend = Arc::new(FilesystemBackend::new(tmp.path().join("validations")));

    backend
        .set(
            &key(&["suite", "stable_run", "batch.json"]),
            &validation_record("stable_run"),
        )
        .unwrap();
    backend.set(&key(&["orphan.json"]), b"{}").unwrap();

    let mut registry = StoreRegistry::new();
    registry.insert("validations_store", StoreKind::Validations, backend.clone());
    let first_log = UpgradeSession::new(&registry, &no_sites()).unwrap().run();
    assert_eq!(
        first_log.upgraded_validations_stores["validations_store"]
            .updated
            .len(),
        1
    );
    assert_eq!(first_log.exceptions.len(), 1);

    let keys_after_first = backend.list_keys().unwrap();
    let migrated_key = keys_after_first
        .iter()
        .find(|k| k.len() == 4)
        .expect("migrated key")
        .clone();
    let migrated_content = backend.get(&migrated_key).unwrap();

    // Second session over the same root: the migrated record is recognized
    // by its structured run identification and left alone.
    let mut registry = StoreRegistry::new();
    registry.insert("validations_store", StoreKind::Validations, backend.clone());
    let second_log = UpgradeSession::new(&registry, &no_sites()).unwrap().run();

    let second_outcome = &second_log.upgraded_validations_stores["validations_store"];
    assert!(second_outcome.updated.is_empty());
    assert_eq!(second_log.exceptions.len(), 1);

    assert_eq!(backend.list_keys().unwrap(), keys_after_first);
    assert_eq!(backend.get(&migrated_key).unwrap(), migrated_content);
}

#[test]
fn docs_site_pages_are_relocated_not_rewritten() {
    let tmp = tempdir().expect("tempdir");
    let site_root = tmp.path().join("data_docs");
    let site_backend = FilesystemBackend::new(site_root.clone());

    // Not JSON: a rewrite attempt would fail loudly.
    let page_key = key(&["suite", "20210101T000000", "batch.html"]);
    let page = b"<html><body>results</body></html>";
    site_backend.set(&page_key, page).unwrap();

    let registry = StoreRegistry::new();
    let mut sites = BTreeMap::new();
    sites.insert(
        "local_site".to_string(),
        SiteConfig {
            backend: BackendConfig::Filesystem { root: site_root },
        },
    );
    let log = UpgradeSession::new(&registry, &sites).unwrap().run();

    assert!(log.exceptions.is_empty());
    let outcome = &log.upgraded_docs_sites["local_site"];
    assert_eq!(outcome.updated.len(), 1);

    let dest = page_key.with_run_time("2021-01-01T00:00:00");
    assert_eq!(site_backend.get(&dest).unwrap(), page.to_vec());
    assert!(site_backend.get(&page_key).is_err());
}

#[test]
fn preflight_summary_names_every_category() {
    let tmp = tempdir().expect("tempdir");
    let mut registry = StoreRegistry::new();
    registry.insert(
        "local_validations",
        StoreKind::Validations,
        Arc::new(FilesystemBackend::new(tmp.path().join("validations"))),
    );
    registry.insert(
        "db_validations",
        StoreKind::Validations,
        Arc::new(DatabaseBackend::open(tmp.path().join("v.db")).unwrap()),
    );
    registry.insert(
        "mem_validations",
        StoreKind::Validations,
        Arc::new(MemoryBackend::new()),
    );

    let mut sites = BTreeMap::new();
    sites.insert(
        "local_site".to_string(),
        SiteConfig {
            backend: BackendConfig::Filesystem {
                root: tmp.path().join("data_docs"),
            },
        },
    );
    let session = UpgradeSession::new(&registry, &sites).unwrap();
    let summary = session.preflight_summary();

    assert!(summary.contains("local_validations"));
    assert!(summary.contains("local_site"));
    assert!(summary.contains("db_validations"));
    assert!(summary.contains("mem_validations"));
    assert!(summary.contains("Documentation sites with unsupported backends: None"));
}

#[test]
fn empty_checklist_still_returns_a_log() {
    let registry = StoreRegistry::new();
    let log = UpgradeSession::new(&registry, &no_sites()).unwrap().run();
    assert!(log.exceptions.is_empty());
    assert!(log.upgraded_validations_stores.is_empty());
    assert!(log.upgraded_docs_sites.is_empty());
}
