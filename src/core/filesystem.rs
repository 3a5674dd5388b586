//! Filesystem store backend: one file per record under a root directory.

use crate::core::backend::{BackendKind, StoreBackend};
use crate::core::error::RestampError;
use crate::core::key::RecordKey;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Backend mapping each key segment to one path component under `root`.
///
/// The root is not required to exist at construction time; a missing root
/// surfaces as a listing failure, which the engine scopes to the whole
/// backend.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical path for a key.
    pub fn path_for_key(&self, key: &RecordKey) -> PathBuf {
        self.root.join(key.to_rel_path())
    }

    fn collect_keys(&self, dir: &Path, out: &mut Vec<RecordKey>) -> Result<(), RestampError> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.collect_keys(&path, out)?;
            } else {
                let rel = path.strip_prefix(&self.root).map_err(|_| {
                    RestampError::Path(format!("file {} escapes backend root", path.display()))
                })?;
                let segments = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned());
                out.push(RecordKey::new(segments)?);
            }
        }
        Ok(())
    }
}

impl StoreBackend for FilesystemBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Filesystem
    }

    fn list_keys(&self) -> Result<Vec<RecordKey>, RestampError> {
        let mut keys = Vec::new();
        self.collect_keys(&self.root, &mut keys)?;
        keys.sort();
        Ok(keys)
    }

    fn get(&self, key: &RecordKey) -> Result<Vec<u8>, RestampError> {
        let path = self.path_for_key(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(RestampError::KeyNotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &RecordKey, value: &[u8]) -> Result<(), RestampError> {
        let path = self.path_for_key(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, value)?;
        Ok(())
    }

    fn remove_key(&self, key: &RecordKey) -> Result<(), RestampError> {
        match fs::remove_file(self.path_for_key(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn move_key(&self, src: &RecordKey, dest: &RecordKey) -> Result<(), RestampError> {
        let src_path = self.path_for_key(src);
        if !src_path.exists() {
            return Err(RestampError::KeyNotFound(src.to_string()));
        }
        let dest_path = self.path_for_key(dest);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&src_path, &dest_path)?;
        Ok(())
    }

    fn url_for_key(&self, key: &RecordKey) -> Result<String, RestampError> {
        let path = self.path_for_key(key);
        if !path.exists() {
            return Err(RestampError::KeyNotFound(key.to_string()));
        }
        Ok(format!("file://{}", path.display()))
    }

    fn provenance_time(&self, key: &RecordKey) -> Result<DateTime<Utc>, RestampError> {
        let modified = fs::metadata(self.path_for_key(key))?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }
}
