//! Object-storage backends: two service variants over one client seam.
//!
//! The engine never talks to a storage service directly. Integrations
//! implement [`ObjectStoreClient`] for their service SDK and wrap it in an
//! [`ObjectBackend`]; the variant decides URL scheme and which metadata
//! timestamp counts as provenance (variant A: last-modified, variant B:
//! created). [`MemoryObjectClient`] is the in-process client used by tests
//! and local dry runs.

use crate::core::backend::{BackendKind, StoreBackend};
use crate::core::error::RestampError;
use crate::core::key::RecordKey;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Service-side metadata for one stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    pub last_modified: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

/// Minimal object-storage surface the backends need.
///
/// Paths are bucket-relative, `/`-separated.
pub trait ObjectStoreClient {
    fn list_objects(&self, prefix: &str) -> Result<Vec<String>, RestampError>;
    fn get_object(&self, path: &str) -> Result<Vec<u8>, RestampError>;
    fn put_object(&self, path: &str, bytes: &[u8]) -> Result<(), RestampError>;
    /// Deleting an absent object is a no-op.
    fn delete_object(&self, path: &str) -> Result<(), RestampError>;
    fn copy_object(&self, src: &str, dest: &str) -> Result<(), RestampError>;
    fn object_meta(&self, path: &str) -> Result<ObjectMeta, RestampError>;
}

/// Store backend over an object-storage service.
pub struct ObjectBackend {
    client: Arc<dyn ObjectStoreClient>,
    bucket: String,
    prefix: Option<String>,
    kind: BackendKind,
}

impl ObjectBackend {
    /// Variant A: provenance is the object's last-modified time.
    pub fn s3(client: Arc<dyn ObjectStoreClient>, bucket: &str, prefix: Option<&str>) -> Self {
        Self::with_kind(client, bucket, prefix, BackendKind::S3)
    }

    /// Variant B: provenance is the blob's created time.
    pub fn gcs(client: Arc<dyn ObjectStoreClient>, bucket: &str, prefix: Option<&str>) -> Self {
        Self::with_kind(client, bucket, prefix, BackendKind::Gcs)
    }

    fn with_kind(
        client: Arc<dyn ObjectStoreClient>,
        bucket: &str,
        prefix: Option<&str>,
        kind: BackendKind,
    ) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: prefix.map(|p| p.trim_matches('/').to_string()),
            kind,
        }
    }

    fn scheme(&self) -> &'static str {
        match self.kind {
            BackendKind::Gcs => "gs",
            _ => "s3",
        }
    }

    fn object_path(&self, key: &RecordKey) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn key_for_path(&self, path: &str) -> Result<RecordKey, RestampError> {
        let rel = match &self.prefix {
            Some(prefix) => path
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .ok_or_else(|| {
                    RestampError::Path(format!(
                        "object {} is outside prefix {}",
                        path, prefix
                    ))
                })?,
            None => path,
        };
        RecordKey::new(rel.split('/'))
    }
}

impl StoreBackend for ObjectBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn list_keys(&self) -> Result<Vec<RecordKey>, RestampError> {
        // Listing with a trailing slash keeps sibling prefixes out
        // (`validations/` must not match `validations_old/...`).
        let prefix = match &self.prefix {
            Some(prefix) => format!("{}/", prefix),
            None => String::new(),
        };
        let mut keys = Vec::new();
        for path in self.client.list_objects(&prefix)? {
            keys.push(self.key_for_path(&path)?);
        }
        keys.sort();
        Ok(keys)
    }

    fn get(&self, key: &RecordKey) -> Result<Vec<u8>, RestampError> {
        self.client.get_object(&self.object_path(key))
    }

    fn set(&self, key: &RecordKey, value: &[u8]) -> Result<(), RestampError> {
        self.client.put_object(&self.object_path(key), value)
    }

    fn remove_key(&self, key: &RecordKey) -> Result<(), RestampError> {
        self.client.delete_object(&self.object_path(key))
    }

    fn move_key(&self, src: &RecordKey, dest: &RecordKey) -> Result<(), RestampError> {
        let src_path = self.object_path(src);
        self.client.copy_object(&src_path, &self.object_path(dest))?;
        self.client.delete_object(&src_path)
    }

    fn url_for_key(&self, key: &RecordKey) -> Result<String, RestampError> {
        let path = self.object_path(key);
        self.client.object_meta(&path)?;
        Ok(format!("{}://{}/{}", self.scheme(), self.bucket, path))
    }

    fn provenance_time(&self, key: &RecordKey) -> Result<DateTime<Utc>, RestampError> {
        let meta = self.client.object_meta(&self.object_path(key))?;
        match self.kind {
            BackendKind::Gcs => Ok(meta.created),
            _ => Ok(meta.last_modified),
        }
    }
}

struct StoredObject {
    bytes: Vec<u8>,
    meta: ObjectMeta,
}

/// In-process object store keyed by bucket-relative path.
#[derive(Default)]
pub struct MemoryObjectClient {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object with explicit service-side timestamps.
    pub fn put_with_meta(&self, path: &str, bytes: &[u8], meta: ObjectMeta) {
        self.objects.lock().unwrap().insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                meta,
            },
        );
    }
}

impl ObjectStoreClient for MemoryObjectClient {
    fn list_objects(&self, prefix: &str) -> Result<Vec<String>, RestampError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn get_object(&self, path: &str) -> Result<Vec<u8>, RestampError> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|obj| obj.bytes.clone())
            .ok_or_else(|| RestampError::KeyNotFound(path.to_string()))
    }

    fn put_object(&self, path: &str, bytes: &[u8]) -> Result<(), RestampError> {
        let now = Utc::now();
        let mut objects = self.objects.lock().unwrap();
        let created = objects.get(path).map(|obj| obj.meta.created).unwrap_or(now);
        objects.insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                meta: ObjectMeta {
                    last_modified: now,
                    created,
                },
            },
        );
        Ok(())
    }

    fn delete_object(&self, path: &str) -> Result<(), RestampError> {
        self.objects.lock().unwrap().remove(path);
        Ok(())
    }

    fn copy_object(&self, src: &str, dest: &str) -> Result<(), RestampError> {
        let mut objects = self.objects.lock().unwrap();
        let source = objects
            .get(src)
            .ok_or_else(|| RestampError::KeyNotFound(src.to_string()))?;
        let copied = StoredObject {
            bytes: source.bytes.clone(),
            meta: source.meta,
        };
        objects.insert(dest.to_string(), copied);
        Ok(())
    }

    fn object_meta(&self, path: &str) -> Result<ObjectMeta, RestampError> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|obj| obj.meta)
            .ok_or_else(|| RestampError::KeyNotFound(path.to_string()))
    }
}
