//! Store and site registries: the named handles a project exposes to the
//! migration session.

use crate::core::backend::StoreBackend;
use crate::core::config::SiteConfig;
use crate::core::error::RestampError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Store type discriminator.
///
/// Only validation stores and metric stores participate in classification;
/// everything else is out of scope for the migration and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// Source-of-truth validation outcome records; content is rewritten.
    Validations,
    /// Derived metric records; never a rewrite target.
    Metrics,
    /// Any other store type.
    #[default]
    Other,
}

impl StoreKind {
    /// Map a config-file store type label onto the closed kind set.
    pub fn from_label(label: &str) -> Self {
        match label {
            "validations" => StoreKind::Validations,
            "metrics" => StoreKind::Metrics,
            _ => StoreKind::Other,
        }
    }
}

/// One named store: its type tag and its backend handle.
pub struct RegisteredStore {
    pub kind: StoreKind,
    pub backend: Arc<dyn StoreBackend>,
}

/// Enumerable mapping of store name to store handle.
#[derive(Default)]
pub struct StoreRegistry {
    stores: BTreeMap<String, RegisteredStore>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, kind: StoreKind, backend: Arc<dyn StoreBackend>) {
        self.stores
            .insert(name.to_string(), RegisteredStore { kind, backend });
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredStore> {
        self.stores.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegisteredStore)> {
        self.stores.iter()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

/// Presentation-layer handle for one documentation site.
///
/// Rendered result pages live in a store of their own; constructing the
/// site is how that backend handle is obtained. Nothing else about the
/// presentation layer matters to the migration.
pub struct DocsSite {
    site_name: String,
    pages_backend: Arc<dyn StoreBackend>,
}

impl DocsSite {
    pub fn new(site_name: &str, config: &SiteConfig) -> Result<Self, RestampError> {
        Ok(Self {
            site_name: site_name.to_string(),
            pages_backend: config.backend.build()?,
        })
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    /// The backend holding rendered result pages.
    pub fn pages_backend(&self) -> Arc<dyn StoreBackend> {
        self.pages_backend.clone()
    }
}
