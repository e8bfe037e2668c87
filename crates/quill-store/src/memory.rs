//! In-memory implementation of BlobStore
//!
//! This implementation is primarily intended for testing and development
//! purposes. It enforces the same optimistic-concurrency rules as the
//! remote store: creates fail against existing objects and conditional
//! writes fail against stale version tokens.

use crate::{BlobStore, BlobStoreError, BlobStoreResult, StoredBlob, VersionToken};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One stored object: its current bytes, token, and revision counter.
#[derive(Debug, Clone)]
struct Revision {
    bytes: Vec<u8>,
    version: VersionToken,
    revision: u64,
}

/// In-memory implementation of BlobStore
///
/// All data is lost when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, Revision>>>,
}

impl MemoryBlobStore {
    /// Create a new in-memory blob store
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Derive a version token for a revision of an object. Hash-based, like
    /// the sha the remote host assigns.
    fn version_for(path: &str, revision: u64, bytes: &[u8]) -> VersionToken {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update(revision.to_be_bytes());
        hasher.update(bytes);
        VersionToken::new(hex::encode(hasher.finalize()))
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, path: &str) -> BlobStoreResult<StoredBlob> {
        let objects = self.objects.read().await;
        match objects.get(path) {
            Some(revision) => Ok(StoredBlob {
                bytes: revision.bytes.clone(),
                version: revision.version.clone(),
            }),
            None => Err(BlobStoreError::NotFound(path.to_string())),
        }
    }

    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        expected: Option<&VersionToken>,
        _message: &str,
    ) -> BlobStoreResult<VersionToken> {
        let mut objects = self.objects.write().await;

        let revision = match (objects.get(path), expected) {
            // First-time creation of a path
            (None, None) => 0,
            // Conditional replace while the token still matches
            (Some(current), Some(token)) if current.version == *token => current.revision + 1,
            // Create over an existing object, or a token that went stale
            _ => {
                return Err(BlobStoreError::Conflict {
                    path: path.to_string(),
                })
            }
        };

        let version = Self::version_for(path, revision, bytes);
        objects.insert(
            path.to_string(),
            Revision {
                bytes: bytes.to_vec(),
                version: version.clone(),
                revision,
            },
        );

        Ok(version)
    }
}
