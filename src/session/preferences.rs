//! Local key/value preferences.
//!
//! Values are kept as a JSON document and rewritten atomically through a
//! temporary file. Encryption at rest belongs to the platform keystore and
//! is not performed here.

use crate::core::{Result, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn is_first_launch(&self) -> Result<bool>;

    async fn mark_launched(&self) -> Result<()>;

    async fn get_secure(&self, key: &str) -> Result<Option<String>>;

    async fn put_secure(&self, key: &str, value: &str) -> Result<()>;

    async fn remove_secure(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PreferenceDocument {
    #[serde(default)]
    launched: bool,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Preferences held only in memory.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    doc: Mutex<PreferenceDocument>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn is_first_launch(&self) -> Result<bool> {
        Ok(!self.doc.lock().await.launched)
    }

    async fn mark_launched(&self) -> Result<()> {
        self.doc.lock().await.launched = true;
        Ok(())
    }

    async fn get_secure(&self, key: &str) -> Result<Option<String>> {
        Ok(self.doc.lock().await.values.get(key).cloned())
    }

    async fn put_secure(&self, key: &str, value: &str) -> Result<()> {
        self.doc
            .lock()
            .await
            .values
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_secure(&self, key: &str) -> Result<()> {
        self.doc.lock().await.values.remove(key);
        Ok(())
    }
}

/// Preferences persisted to a JSON file.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    doc: Mutex<PreferenceDocument>,
}

impl FilePreferenceStore {
    /// Opens the store at `path`, starting empty when the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc: PreferenceDocument = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                StoreError::Serialization(format!(
                    "Failed to parse preferences '{}': {}",
                    path.display(),
                    err
                ))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => PreferenceDocument::default(),
            Err(err) => {
                return Err(StoreError::Io(format!(
                    "Failed to read preferences '{}': {}",
                    path.display(),
                    err
                )));
            }
        };

        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, doc: &PreferenceDocument) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        atomic_write(&self.path, &bytes).await
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn is_first_launch(&self) -> Result<bool> {
        Ok(!self.doc.lock().await.launched)
    }

    async fn mark_launched(&self) -> Result<()> {
        let mut doc = self.doc.lock().await;
        if doc.launched {
            return Ok(());
        }
        doc.launched = true;
        self.persist(&doc).await
    }

    async fn get_secure(&self, key: &str) -> Result<Option<String>> {
        Ok(self.doc.lock().await.values.get(key).cloned())
    }

    async fn put_secure(&self, key: &str, value: &str) -> Result<()> {
        let mut doc = self.doc.lock().await;
        doc.values.insert(key.to_string(), value.to_string());
        self.persist(&doc).await
    }

    async fn remove_secure(&self, key: &str) -> Result<()> {
        let mut doc = self.doc.lock().await;
        if doc.values.remove(key).is_some() {
            self.persist(&doc).await?;
        }
        Ok(())
    }
}

async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|err| {
            StoreError::Io(format!(
                "Failed to create parent directory '{}': {}",
                parent.display(),
                err
            ))
        })?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await.map_err(|err| {
        StoreError::Io(format!(
            "Failed to write temp file '{}': {}",
            tmp.display(),
            err
        ))
    })?;

    fs::rename(&tmp, path).await.map_err(|err| {
        StoreError::Io(format!(
            "Failed to rename temp file '{}' -> '{}': {}",
            tmp.display(),
            path.display(),
            err
        ))
    })?;
    Ok(())
}
