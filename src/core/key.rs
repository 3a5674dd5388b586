//! Record keys: ordered path segments addressing one record in a backend.
//!
//! The run identifier is always the second-to-last segment. A destination
//! key is the source key with the resolved run time inserted immediately
//! before the final segment.

use crate::core::error::RestampError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Ordered sequence of path-like segments identifying one record.
///
/// Keys are immutable once constructed. Segments are validated so a key can
/// never escape a backend's root: empty segments, `.`, `..`, and separator
/// characters are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey(Vec<String>);

impl RecordKey {
    pub fn new<I, S>(segments: I) -> Result<Self, RestampError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(RestampError::Path("record key has no segments".to_string()));
        }
        for segment in &segments {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(RestampError::Path(format!(
                    "invalid key segment: {:?}",
                    segment
                )));
            }
            if segment.contains('/') || segment.contains('\\') || segment.contains('\0') {
                return Err(RestampError::Path(format!(
                    "key segment contains a path separator: {:?}",
                    segment
                )));
            }
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The run identifier: the second-to-last segment.
    pub fn run_id(&self) -> Result<&str, RestampError> {
        if self.0.len() < 2 {
            return Err(RestampError::Path(format!(
                "key {} is too short to carry a run identifier",
                self
            )));
        }
        Ok(&self.0[self.0.len() - 2])
    }

    /// Destination key: the resolved run time inserted before the final
    /// segment. All other segments keep their position and order.
    pub fn with_run_time(&self, run_time: &str) -> Self {
        let mut segments = self.0.clone();
        segments.insert(segments.len() - 1, run_time.to_string());
        Self(segments)
    }

    /// Relative path under a backend root, one directory per segment.
    pub fn to_rel_path(&self) -> PathBuf {
        self.0.iter().collect()
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_is_second_to_last_segment() {
        let key = RecordKey::new(["suite", "run_one", "batch.json"]).unwrap();
        assert_eq!(key.run_id().unwrap(), "run_one");
    }

    #[test]
    fn test_run_id_requires_two_segments() {
        let key = RecordKey::new(["orphan.json"]).unwrap();
        assert!(key.run_id().is_err());
    }

    #[test]
    fn test_with_run_time_inserts_before_final_segment() {
        let key = RecordKey::new(["suite", "sub", "run_one", "batch.json"]).unwrap();
        let dest = key.with_run_time("2021-01-01T00:00:00");
        assert_eq!(dest.len(), key.len() + 1);
        assert_eq!(
            dest.segments(),
            &["suite", "sub", "run_one", "2021-01-01T00:00:00", "batch.json"]
        );
        // Non-inserted segments are unchanged and in original order.
        let mut without_inserted: Vec<&String> = dest.segments().iter().collect();
        without_inserted.remove(dest.len() - 2);
        let original: Vec<&String> = key.segments().iter().collect();
        assert_eq!(without_inserted, original);
    }

    #[test]
    fn test_rejects_unsafe_segments() {
        assert!(RecordKey::new(Vec::<String>::new()).is_err());
        assert!(RecordKey::new(["suite", ""]).is_err());
        assert!(RecordKey::new(["suite", ".."]).is_err());
        assert!(RecordKey::new(["suite", "a/b"]).is_err());
    }

    #[test]
    fn test_display_joins_segments() {
        let key = RecordKey::new(["a", "b", "c.json"]).unwrap();
        assert_eq!(key.to_string(), "a/b/c.json");
    }
}
