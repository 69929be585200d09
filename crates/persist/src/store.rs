//! Key-value stores behind the persistence boundary.
//!
//! File layout inside a [`FileStore`] directory:
//! ```text
//! store.meta.json          - schema version
//! values/
//!   plaza.resume.json      - one file per key
//! integrity/
//!   manifest.json          - sha256 per value file
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const STORE_SCHEMA_VERSION: u32 = 1;

/// Failures of a [`KeyValueStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed for {key}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("invalid key {0:?}")]
    InvalidKey(String),
}

/// External key-value store the core offers its records to.
pub trait KeyValueStore {
    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Returns whether the key existed.
    fn remove(&mut self, key: &str) -> Result<bool, StoreError>;
}

/// In-memory store for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_key(key)?;
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.values.remove(key).is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreMeta {
    schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    filename: String,
    sha256: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IntegrityManifest {
    entries: BTreeMap<String, ManifestEntry>,
}

/// File-backed store with schema versioning and per-value integrity hashes.
///
/// Reads fail closed: a value whose bytes no longer match the manifest is an
/// error, never silently returned.
pub struct FileStore {
    root: PathBuf,
    manifest: IntegrityManifest,
}

impl FileStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("values"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join("store.meta.json");
        let manifest_path = root.join("integrity").join("manifest.json");

        let manifest = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.schema_version != STORE_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: STORE_SCHEMA_VERSION,
                });
            }
            if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                IntegrityManifest::default()
            }
        } else {
            let meta = StoreMeta {
                schema_version: STORE_SCHEMA_VERSION,
            };
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
            IntegrityManifest::default()
        };

        let store = Self { root, manifest };
        store.save_manifest()?;
        tracing::debug!(root = %store.root.display(), keys = store.manifest.entries.len(), "store opened");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recheck every value file against the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        for (key, entry) in &self.manifest.entries {
            let data = std::fs::read(self.root.join("values").join(&entry.filename))?;
            check_digest(key, &entry.sha256, &data)?;
        }
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_key(key)?;
        let filename = format!("{key}.json");
        std::fs::write(self.root.join("values").join(&filename), value.as_bytes())?;
        self.manifest.entries.insert(
            key.to_string(),
            ManifestEntry {
                filename,
                sha256: sha256_hex(value.as_bytes()),
            },
        );
        self.save_manifest()
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(entry) = self.manifest.entries.get(key) else {
            return Ok(None);
        };
        let data = std::fs::read(self.root.join("values").join(&entry.filename))?;
        check_digest(key, &entry.sha256, &data)?;
        String::from_utf8(data)
            .map(Some)
            .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        let Some(entry) = self.manifest.entries.remove(key) else {
            return Ok(false);
        };
        let path = self.root.join("values").join(&entry.filename);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        self.save_manifest()?;
        Ok(true)
    }
}

/// Keys become file names, so they must stay inside the values directory.
fn check_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.contains(['/', '\\'])
        || key.contains("..")
        || key.chars().any(char::is_control);
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn check_digest(key: &str, expected: &str, data: &[u8]) -> Result<(), StoreError> {
    let actual = sha256_hex(data);
    if actual != expected {
        return Err(StoreError::IntegrityMismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
