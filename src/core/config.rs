//! Project configuration: which stores and documentation sites exist, and
//! on which backends they live.
//!
//! Loaded from a TOML file (`restamp.toml` by default). Filesystem and
//! database paths may be relative; they resolve against the directory
//! containing the config file.

use crate::core::backend::{BackendKind, StoreBackend};
use crate::core::database::DatabaseBackend;
use crate::core::error::RestampError;
use crate::core::filesystem::FilesystemBackend;
use crate::core::memory::MemoryBackend;
use crate::core::registry::{StoreKind, StoreRegistry};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub stores: BTreeMap<String, StoreConfig>,
    #[serde(default)]
    pub sites: BTreeMap<String, SiteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store type label; anything but `validations`/`metrics` is ignored.
    #[serde(rename = "type", default)]
    pub store_type: String,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub backend: BackendConfig,
}

impl SiteConfig {
    /// Site configuration around an already-wired backend handle.
    pub fn from_backend(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend: BackendConfig::Wired(backend),
        }
    }
}

/// Backend declaration, tagged by kind.
#[derive(Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Filesystem { root: PathBuf },
    Database { path: PathBuf },
    Memory,
    S3 { bucket: String, prefix: Option<String> },
    Gcs { bucket: String, prefix: Option<String> },
    /// Pre-wired backend handle. Not expressible in config files; this is
    /// how object-storage backends, which need a service client, enter a
    /// session through the library API.
    #[serde(skip)]
    Wired(Arc<dyn StoreBackend>),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Filesystem { .. } => BackendKind::Filesystem,
            BackendConfig::Database { .. } => BackendKind::Database,
            BackendConfig::Memory => BackendKind::Memory,
            BackendConfig::S3 { .. } => BackendKind::S3,
            BackendConfig::Gcs { .. } => BackendKind::Gcs,
            BackendConfig::Wired(backend) => backend.kind(),
        }
    }

    /// Construct the backend handle this declaration describes.
    ///
    /// Object-storage backends need a service client and cannot be built
    /// from configuration alone; wrap an [`crate::core::object::ObjectBackend`]
    /// in [`BackendConfig::Wired`] instead.
    pub fn build(&self) -> Result<Arc<dyn StoreBackend>, RestampError> {
        match self {
            BackendConfig::Filesystem { root } => Ok(Arc::new(FilesystemBackend::new(root.clone()))),
            BackendConfig::Database { path } => Ok(Arc::new(DatabaseBackend::open(path.clone())?)),
            BackendConfig::Memory => Ok(Arc::new(MemoryBackend::new())),
            BackendConfig::S3 { bucket, .. } | BackendConfig::Gcs { bucket, .. } => {
                Err(RestampError::Config(format!(
                    "{} backend for bucket {:?} requires an object-store client; wire it up through the library API",
                    self.kind(),
                    bucket
                )))
            }
            BackendConfig::Wired(backend) => Ok(backend.clone()),
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        // Only local media carry paths; everything else is addressed by
        // service-side names.
        match self {
            BackendConfig::Filesystem { root } => {
                if root.is_relative() {
                    *root = base.join(&root);
                }
            }
            BackendConfig::Database { path } => {
                if path.is_relative() {
                    *path = base.join(&path);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendConfig::Filesystem { root } => {
                f.debug_struct("Filesystem").field("root", root).finish()
            }
            BackendConfig::Database { path } => {
                f.debug_struct("Database").field("path", path).finish()
            }
            BackendConfig::Memory => f.write_str("Memory"),
            BackendConfig::S3 { bucket, prefix } => f
                .debug_struct("S3")
                .field("bucket", bucket)
                .field("prefix", prefix)
                .finish(),
            BackendConfig::Gcs { bucket, prefix } => f
                .debug_struct("Gcs")
                .field("bucket", bucket)
                .field("prefix", prefix)
                .finish(),
            BackendConfig::Wired(backend) => {
                f.debug_tuple("Wired").field(&backend.kind()).finish()
            }
        }
    }
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self, RestampError> {
        let raw = fs::read_to_string(path)?;
        let mut config: ProjectConfig = toml::from_str(&raw)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for store in config.stores.values_mut() {
            store.backend.resolve_paths(base);
        }
        for site in config.sites.values_mut() {
            site.backend.resolve_paths(base);
        }
        Ok(config)
    }

    /// Build the store registry this config declares.
    pub fn build_registry(&self) -> Result<StoreRegistry, RestampError> {
        let mut registry = StoreRegistry::new();
        for (name, store) in &self.stores {
            registry.insert(
                name,
                StoreKind::from_label(&store.store_type),
                store.backend.build()?,
            );
        }
        Ok(registry)
    }
}
