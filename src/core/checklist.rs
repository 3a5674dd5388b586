//! Checklist construction: classify every registered store and site once,
//! at session start.
//!
//! Classification is by backend kind only. Database-backed stores need
//! manual handling; unrecognized kinds are informational skips; in-memory
//! metric stores are ignored outright (metric stores are never rewrite
//! targets, so there is nothing to report).

use crate::core::backend::{BackendKind, StoreBackend};
use crate::core::config::SiteConfig;
use crate::core::error::RestampError;
use crate::core::log::UpgradeLog;
use crate::core::registry::{DocsSite, StoreKind, StoreRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Backends that will be migrated, keyed by store or site name.
#[derive(Default)]
pub struct Checklist {
    pub validations: BTreeMap<String, Arc<dyn StoreBackend>>,
    pub docs_sites: BTreeMap<String, Arc<dyn StoreBackend>>,
}

/// Classify every store and site; skips are appended to `log`.
pub fn build(
    stores: &StoreRegistry,
    sites: &BTreeMap<String, SiteConfig>,
    log: &mut UpgradeLog,
) -> Result<Checklist, RestampError> {
    let mut checklist = Checklist::default();

    for (name, store) in stores.iter() {
        let kind = store.backend.kind();
        match store.kind {
            StoreKind::Validations => {
                if kind == BackendKind::Database {
                    log.skip_validations_database(name, kind.label());
                } else if kind.is_migratable() {
                    checklist
                        .validations
                        .insert(name.clone(), store.backend.clone());
                } else {
                    log.skip_validations_unsupported(name, kind.label());
                }
            }
            StoreKind::Metrics => {
                if kind == BackendKind::Database {
                    log.skip_metrics_database(name, kind.label());
                } else if kind == BackendKind::Memory {
                    // Intentionally unreported.
                } else {
                    log.skip_metrics_unsupported(name, kind.label());
                }
            }
            StoreKind::Other => {}
        }
    }

    for (site_name, site_config) in sites {
        let kind = site_config.backend.kind();
        if kind.is_migratable() {
            let site = DocsSite::new(site_name, site_config)?;
            checklist
                .docs_sites
                .insert(site_name.clone(), site.pages_backend());
        } else {
            log.skip_site_unsupported(site_name, kind.label());
        }
    }

    Ok(checklist)
}
