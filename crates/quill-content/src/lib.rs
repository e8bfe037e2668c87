//! Quill Content Repository
//!
//! The domain-level service behind the publishing API. Understands content
//! kinds and keeps each item's catalog entry consistent with the item
//! itself: every upsert writes the content blob and folds a summary record
//! into the kind's index document.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

use quill_store::{BlobStoreError, VersionToken};

mod repository;

pub use repository::ContentRepository;

/// The category of a content item, determining its storage path and which
/// index document catalogs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Project,
    Note,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Project => "project",
            ContentKind::Note => "note",
        }
    }

    /// Plural form used in storage paths.
    pub fn plural(&self) -> &'static str {
        match self {
            ContentKind::Post => "posts",
            ContentKind::Project => "projects",
            ContentKind::Note => "notes",
        }
    }

    /// Path of one item's content file.
    pub fn blob_path(&self, id: &str) -> String {
        format!("content/{}/{}.md", self.plural(), id)
    }

    /// Path of the kind's index document.
    pub fn index_path(&self) -> String {
        format!("content/{}.json", self.plural())
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ContentKind::Post),
            "project" => Ok(ContentKind::Project),
            "note" => Ok(ContentKind::Note),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Returned when parsing a kind name that the repository does not know.
#[derive(Error, Debug)]
#[error("unknown content kind: {0}")]
pub struct UnknownKind(pub String);

/// Summary record describing one content item for listing purposes.
///
/// Exactly one entry exists per (kind, id) pair that has ever been
/// upserted; entries are replaced in place, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub title: String,
    pub category: String,
    /// ISO-8601 day the item was last meaningfully updated.
    pub date: String,
}

/// One insert-or-update request for a content item.
#[derive(Debug, Clone)]
pub struct UpsertRequest {
    pub kind: ContentKind,
    /// Absent for new items; the repository generates one.
    pub id: Option<String>,
    pub title: String,
    pub category: String,
    pub body: String,
}

/// Confirmation of a fully committed upsert: both the content blob and its
/// index entry were written, each as a new revision in the backing store.
#[derive(Debug, Clone)]
pub struct UpsertReceipt {
    /// The id actually used, important when the caller omitted one.
    pub id: String,
    pub content_version: VersionToken,
    pub index_version: VersionToken,
}

/// Errors that can occur during content repository operations.
///
/// The blob and index writes are not atomic. Index-side failures carry the
/// already committed content version so callers can tell "nothing
/// happened" from "partially happened"; the recovery for a partial write
/// is to re-issue the same upsert.
#[derive(Error, Debug)]
pub enum ContentError {
    /// Credential mismatch. Nothing was written.
    #[error("invalid publish credential")]
    Unauthorized,

    /// The content blob could not be written. The index was not touched.
    #[error("failed to write content {id}: {source}")]
    ContentWriteFailed {
        id: String,
        #[source]
        source: BlobStoreError,
    },

    /// The content blob was committed but the index document could not be
    /// read back. The item exists but is uncataloged until a retry.
    #[error("content {id} was written but its index could not be read: {source}")]
    IndexReadFailed {
        id: String,
        content_version: VersionToken,
        #[source]
        source: anyhow::Error,
    },

    /// The content blob was committed but the index write was rejected,
    /// most commonly because a concurrent upsert moved the index forward.
    #[error("content {id} was written but its index entry was not: {source}")]
    IndexUpdateFailed {
        id: String,
        content_version: VersionToken,
        #[source]
        source: BlobStoreError,
    },

    /// No item with this id exists.
    #[error("no {kind} with id {id}")]
    NotFound { kind: ContentKind, id: String },

    /// A read-only operation failed against the backing store.
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: BlobStoreError,
    },

    /// An index document exists but does not parse as an entry array.
    #[error("index document at {path} is malformed: {source}")]
    IndexCorrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for content repository operations
pub type ContentResult<T> = Result<T, ContentError>;
