//! # Blob Store Contract
//!
//! Keys are relative, `/`-separated paths such as
//! `licenses/generated/NEHRU_MLA_Asha_Rao.pdf`. [`BlobStore::save`] never
//! overwrites: a colliding key gets a numeric suffix before the extension
//! and the key actually used is returned. [`BlobStore::put`] overwrites.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::BlobError;

/// Upper bound on suffix probing before giving up.
const MAX_SUFFIX: u32 = 10_000;

/// Persistence for photos and generated certificates.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` or a disambiguated variant. Returns the key used.
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<String, BlobError>;

    /// Store `bytes` under exactly `key`, replacing any existing blob.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobError>;

    /// Read a blob.
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Remove a blob. Removing a missing blob is not an error.
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Reject keys that are empty, absolute, or contain `..` segments.
pub fn validate_key(key: &str) -> Result<(), BlobError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(BlobError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// `n`th alternative for a colliding key: `dir/name_n.ext`.
fn suffixed(key: &str, n: u32) -> String {
    let (dir, file) = match key.rfind('/') {
        Some(i) => key.split_at(i + 1),
        None => ("", key),
    };
    match file.rfind('.') {
        Some(dot) if dot > 0 => format!("{dir}{}_{n}{}", &file[..dot], &file[dot..]),
        _ => format!("{dir}{file}_{n}"),
    }
}

fn candidates(key: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(key.to_string()).chain((1..=MAX_SUFFIX).map(move |n| suffixed(key, n)))
}

/// Fill a file just claimed with `create_new`. A failed write removes the
/// file so the key is free again.
async fn fill_claimed<W>(path: &Path, mut file: W, bytes: &[u8]) -> Result<(), BlobError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;
    drop(file);

    if let Err(err) = written {
        if let Err(rm) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %rm, "failed to remove partial blob");
        }
        return Err(err.into());
    }
    Ok(())
}

// -- In-memory ----------------------------------------------------------------

/// In-memory blob store, for tests and ephemeral deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.blobs.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
        validate_key(key)?;
        let mut blobs = self.blobs.write();
        let free = candidates(key)
            .find(|k| !blobs.contains_key(k))
            .ok_or_else(|| BlobError::Exhausted(key.to_string()))?;
        blobs.insert(free.clone(), bytes);
        Ok(free)
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        validate_key(key)?;
        self.blobs.write().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        validate_key(key)?;
        self.blobs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        validate_key(key)?;
        self.blobs.write().remove(key);
        Ok(())
    }
}

// -- Filesystem ---------------------------------------------------------------

/// Blob store rooted at a media directory.
///
/// `save` claims its key with `create_new`, so concurrent saves of the same
/// name land on distinct files.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The media root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }

    async fn ensure_parent(path: &Path) -> Result<(), BlobError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
        Self::ensure_parent(&self.path_for(key)?).await?;
        for candidate in candidates(key) {
            let path = self.path_for(&candidate)?;
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    fill_claimed(&path, file, &bytes).await?;
                    return Ok(candidate);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(BlobError::Exhausted(key.to_string()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path).await?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
