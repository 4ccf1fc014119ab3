//! Object storage boundary
//!
//! The runner fetches its bundle through the [`ObjectStore`] trait so the
//! storage backend is injectable. The filesystem implementation maps a
//! bucket to a subdirectory under a configured root; a cloud adapter (S3 or
//! compatible) implements the same trait outside this crate.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object {key} not found in bucket {bucket}")]
    NotFound { bucket: String, key: String },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only object storage: fetch one object as bytes.
pub trait ObjectStore {
    fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Filesystem-backed store. `bucket` is a subdirectory of `root`, `key` a
/// relative path within it.
#[derive(Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for FsObjectStore {
    fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.root.join(bucket).join(key);
        if !path.is_file() {
            return Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        std::fs::read(&path).map_err(|e| StoreError::Io { path, source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_fetch_existing_object() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        fs::create_dir(root.path().join("artifacts")).expect("mkdir");
        fs::write(root.path().join("artifacts/bundle.zip"), b"bytes").expect("write");

        let store = FsObjectStore::new(root.path());
        let bytes = store.fetch("artifacts", "bundle.zip").expect("fetch");
        assert_eq!(bytes, b"bytes");
    }

    #[test]
    fn test_fetch_missing_object_is_not_found() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FsObjectStore::new(root.path());

        match store.fetch("artifacts", "missing.zip") {
            Err(StoreError::NotFound { bucket, key }) => {
                assert_eq!(bucket, "artifacts");
                assert_eq!(key, "missing.zip");
            }
            other => panic!("Expected StoreError::NotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_fetch_nested_key() {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        fs::create_dir_all(root.path().join("bucket/builds/42")).expect("mkdir");
        fs::write(root.path().join("bucket/builds/42/artifact.zip"), b"x").expect("write");

        let store = FsObjectStore::new(root.path());
        let bytes = store.fetch("bucket", "builds/42/artifact.zip").expect("fetch");
        assert_eq!(bytes, b"x");
    }
}
