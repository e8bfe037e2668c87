//! Quill Blob Store
//!
//! Provides abstractions and implementations for versioned blob storage.
//! The BlobStore trait defines a contract for reading and writing named
//! byte blobs with optimistic-concurrency version tokens.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use thiserror::Error;

/// Opaque revision identifier for one stored object.
///
/// The backing host assigns a fresh token on every write. A conditional
/// write must carry the token last observed for the object; the host
/// rejects the write if the object has moved on since.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the string representation of the token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A blob read back from the store together with its current version.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub version: VersionToken,
}

/// Errors that can occur during blob store operations
#[derive(Error, Debug)]
pub enum BlobStoreError {
    /// No object exists at the given path.
    #[error("no object at {0}")]
    NotFound(String),

    /// The write was rejected because the supplied version token no longer
    /// matches the object's current revision, or an unconditional create
    /// raced an object that already exists.
    #[error("stale version token writing {path}")]
    Conflict { path: String },

    /// The backend answered with an unexpected status. Carries the raw
    /// response body for diagnostics.
    #[error("backend returned status {status} for {path}: {body}")]
    BackendUnavailable {
        path: String,
        status: u16,
        body: String,
    },

    /// Transport fault or malformed backend response. The outcome of an
    /// in-flight write is unknown when this is returned.
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Result type for BlobStore operations
pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

/// Trait defining the contract for versioned blob storage implementations
#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    /// Fetch the blob at `path` together with its current version token.
    ///
    /// Fails with [`BlobStoreError::NotFound`] when no object exists at
    /// `path`. Callers that can substitute a default value must catch that
    /// variant themselves; the store never invents content.
    async fn get(&self, path: &str) -> BlobStoreResult<StoredBlob>;

    /// Write `bytes` to `path`, creating a new immutable revision, and
    /// return the new version token.
    ///
    /// `expected = None` creates the object and fails with
    /// [`BlobStoreError::Conflict`] if it already exists. With
    /// `expected = Some(token)` the write goes through only while the
    /// object's current revision still matches `token`. `message` labels
    /// the revision in the backing host's history.
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        expected: Option<&VersionToken>,
        message: &str,
    ) -> BlobStoreResult<VersionToken>;
}

// Re-export modules so they can be used from other crates
pub mod github;
pub mod memory;
