//! Storage for member documents (medical certificates, identity documents).
//!
//! Only the storage key is kept in the database; the bytes live behind a
//! [`DocumentStore`]. Keys look like `lic/DUPONT_Jean/certificat.pdf`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from document storage.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Key is absolute or escapes the storage root.
    #[error("invalid document key: {0}")]
    InvalidKey(String),

    #[error("document storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Object storage for uploaded documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), DocumentError>;

    /// Remove the object at `key`. Removing a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), DocumentError>;
}

/// Documents stored as files under a root directory.
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DocumentError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(DocumentError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), DocumentError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, size = bytes.len(), "document stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DocumentError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Documents kept in memory, for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct MemoryDocumentStore {
    objects: tokio::sync::Mutex<std::collections::BTreeMap<String, Vec<u8>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), DocumentError> {
        self.objects
            .lock()
            .await
            .insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DocumentError> {
        self.objects.lock().await.remove(key);
        Ok(())
    }
}
