//! The content repository implementation
//!
//! Maps one domain upsert onto the two underlying store writes: the
//! content blob at `content/{kind}s/{id}.md` and the kind's index document
//! at `content/{kind}s.json`. The two writes are strictly sequential and
//! not atomic; see [`ContentError`] for how partial outcomes surface.

use crate::{
    ContentError, ContentKind, ContentResult, IndexEntry, UpsertReceipt, UpsertRequest,
};
use chrono::Utc;
use quill_store::{BlobStore, BlobStoreError, StoredBlob, VersionToken};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The only component that understands content kinds. Owns the mapping
/// from upsert requests to blob writes; the store underneath is a generic
/// versioned key/bytes store and owns nothing domain-specific.
#[derive(Clone)]
pub struct ContentRepository {
    store: Arc<dyn BlobStore>,
    /// Server-side secret that upsert credentials are matched against.
    /// `None` disables publishing entirely: every upsert is rejected.
    publish_key: Option<String>,
}

impl std::fmt::Debug for ContentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRepository")
            .field("store", &self.store)
            .field("publishing_enabled", &self.publish_key.is_some())
            .finish()
    }
}

impl ContentRepository {
    /// Create a new ContentRepository. The publish key is injected here
    /// rather than read from ambient process state.
    pub fn new(store: Arc<dyn BlobStore>, publish_key: Option<String>) -> Self {
        Self { store, publish_key }
    }

    /// Insert or update one content item.
    ///
    /// Writes the content blob first (last-writer-wins), then folds the
    /// item's summary into the kind's index document under the store's
    /// optimistic-concurrency check. There is no retry loop: a caller that
    /// loses the index race re-issues the whole upsert, which re-reads a
    /// fresh index and succeeds absent continued contention.
    pub async fn upsert(
        &self,
        credential: &str,
        request: UpsertRequest,
    ) -> ContentResult<UpsertReceipt> {
        match &self.publish_key {
            Some(key) if credential == key => {}
            _ => {
                warn!("Rejected {} upsert: invalid credential", request.kind);
                return Err(ContentError::Unauthorized);
            }
        }

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| generated_id(request.kind, Utc::now().timestamp_millis()));
        info!("Upserting {} {}", request.kind, id);

        let content_version = self.write_content(&id, &request).await?;
        let index_version = self
            .update_index(&id, &request, &content_version)
            .await?;

        debug!("Upsert of {} {} complete", request.kind, id);
        Ok(UpsertReceipt {
            id,
            content_version,
            index_version,
        })
    }

    /// Raw body bytes of one item.
    pub async fn fetch_body(&self, kind: ContentKind, id: &str) -> ContentResult<Vec<u8>> {
        let path = kind.blob_path(id);
        match self.store.get(&path).await {
            Ok(blob) => Ok(blob.bytes),
            Err(BlobStoreError::NotFound(_)) => Err(ContentError::NotFound {
                kind,
                id: id.to_string(),
            }),
            Err(e) => Err(ContentError::ReadFailed { path, source: e }),
        }
    }

    /// All index entries for a kind, in catalog order. A kind whose index
    /// document does not exist yet reads as empty.
    pub async fn list(&self, kind: ContentKind) -> ContentResult<Vec<IndexEntry>> {
        let path = kind.index_path();
        match self.store.get(&path).await {
            Ok(blob) => serde_json::from_slice(&blob.bytes)
                .map_err(|e| ContentError::IndexCorrupt { path, source: e }),
            Err(BlobStoreError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(ContentError::ReadFailed { path, source: e }),
        }
    }

    /// Step 1: overwrite the content blob, last-writer-wins. The host
    /// needs the current version token to replace an existing file, so it
    /// is resolved immediately before the write; this is not an optimistic
    /// check against any earlier read. The blob is only ever replaced
    /// wholesale, never merged.
    async fn write_content(
        &self,
        id: &str,
        request: &UpsertRequest,
    ) -> ContentResult<VersionToken> {
        let path = request.kind.blob_path(id);

        let current = match self.store.get(&path).await {
            Ok(blob) => Some(blob.version),
            Err(BlobStoreError::NotFound(_)) => None,
            Err(e) => {
                return Err(ContentError::ContentWriteFailed {
                    id: id.to_string(),
                    source: e,
                })
            }
        };

        let message = format!("Update {}: {}", request.kind, request.title);
        self.store
            .put(&path, request.body.as_bytes(), current.as_ref(), &message)
            .await
            .map_err(|e| ContentError::ContentWriteFailed {
                id: id.to_string(),
                source: e,
            })
    }

    /// Step 2: insert-or-replace the item's entry in the kind's index
    /// document, conditioned on the version token read in this same step.
    async fn update_index(
        &self,
        id: &str,
        request: &UpsertRequest,
        content_version: &VersionToken,
    ) -> ContentResult<VersionToken> {
        let path = request.kind.index_path();

        let (mut entries, index_token) = match self.store.get(&path).await {
            Ok(StoredBlob { bytes, version }) => {
                let entries: Vec<IndexEntry> =
                    serde_json::from_slice(&bytes).map_err(|e| ContentError::IndexReadFailed {
                        id: id.to_string(),
                        content_version: content_version.clone(),
                        source: anyhow::anyhow!("malformed index document at {}: {}", path, e),
                    })?;
                (entries, Some(version))
            }
            // First upsert for this kind: start an empty index and create
            // the document unconditionally below.
            Err(BlobStoreError::NotFound(_)) => (Vec::new(), None),
            Err(e) => {
                return Err(ContentError::IndexReadFailed {
                    id: id.to_string(),
                    content_version: content_version.clone(),
                    source: anyhow::Error::new(e),
                })
            }
        };

        merge_entry(
            &mut entries,
            IndexEntry {
                id: id.to_string(),
                title: request.title.clone(),
                category: request.category.clone(),
                date: Utc::now().format("%Y-%m-%d").to_string(),
            },
        );

        let serialized = serde_json::to_vec_pretty(&entries).map_err(|e| {
            ContentError::IndexUpdateFailed {
                id: id.to_string(),
                content_version: content_version.clone(),
                source: BlobStoreError::Backend(anyhow::Error::new(e)),
            }
        })?;

        let message = format!(
            "Update {}.json for {}: {}",
            request.kind.plural(),
            request.kind,
            request.title
        );
        self.store
            .put(&path, &serialized, index_token.as_ref(), &message)
            .await
            .map_err(|e| ContentError::IndexUpdateFailed {
                id: id.to_string(),
                content_version: content_version.clone(),
                source: e,
            })
    }
}

/// Replace the entry with a matching id in place, preserving its position
/// in the catalog, or append a new entry at the end.
fn merge_entry(entries: &mut Vec<IndexEntry>, entry: IndexEntry) {
    match entries.iter_mut().find(|existing| existing.id == entry.id) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

/// Server-generated id: the kind name followed by the request's
/// unix-millisecond timestamp. Practically unique without a coordination
/// service.
fn generated_id(kind: ContentKind, unix_millis: i64) -> String {
    format!("{}{}", kind, unix_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_store::memory::MemoryBlobStore;
    use quill_store::BlobStoreResult;
    use std::sync::atomic::{AtomicBool, Ordering};

    const PUBLISH_KEY: &str = "test-publish-key";

    fn repository(store: Arc<dyn BlobStore>) -> ContentRepository {
        ContentRepository::new(store, Some(PUBLISH_KEY.to_string()))
    }

    fn post_request(id: Option<&str>, title: &str, category: &str, body: &str) -> UpsertRequest {
        UpsertRequest {
            kind: ContentKind::Post,
            id: id.map(|s| s.to_string()),
            title: title.to_string(),
            category: category.to_string(),
            body: body.to_string(),
        }
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Store wrapper that lets a rival writer win the index race exactly
    /// once, producing a genuine token conflict on the wrapped put.
    #[derive(Debug)]
    struct RacingIndexStore {
        inner: MemoryBlobStore,
        raced: AtomicBool,
    }

    impl RacingIndexStore {
        fn new(inner: MemoryBlobStore) -> Self {
            Self {
                inner,
                raced: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl BlobStore for RacingIndexStore {
        async fn get(&self, path: &str) -> BlobStoreResult<StoredBlob> {
            self.inner.get(path).await
        }

        async fn put(
            &self,
            path: &str,
            bytes: &[u8],
            expected: Option<&VersionToken>,
            message: &str,
        ) -> BlobStoreResult<VersionToken> {
            if path.ends_with(".json") && !self.raced.swap(true, Ordering::SeqCst) {
                let rival = br#"[{"id":"rival","title":"Rival","category":"CS","date":"2026-01-01"}]"#;
                self.inner
                    .put(path, rival, expected, "rival writer")
                    .await?;
            }
            self.inner.put(path, bytes, expected, message).await
        }
    }

    #[tokio::test]
    async fn test_first_upsert_bootstraps_index() {
        let store = Arc::new(MemoryBlobStore::new());
        let repo = repository(store.clone());

        let receipt = repo
            .upsert(PUBLISH_KEY, post_request(None, "Hello", "CS", "# Hello"))
            .await
            .unwrap();

        assert!(receipt.id.starts_with("post"));
        assert_eq!(
            repo.fetch_body(ContentKind::Post, &receipt.id).await.unwrap(),
            b"# Hello"
        );

        let entries = repo.list(ContentKind::Post).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0],
            IndexEntry {
                id: receipt.id.clone(),
                title: "Hello".to_string(),
                category: "CS".to_string(),
                date: today(),
            }
        );
    }

    #[tokio::test]
    async fn test_reupsert_is_idempotent() {
        let store = Arc::new(MemoryBlobStore::new());
        let repo = repository(store.clone());
        let request = post_request(Some("post42"), "Hello", "CS", "# Hello");

        repo.upsert(PUBLISH_KEY, request.clone()).await.unwrap();
        repo.upsert(PUBLISH_KEY, request).await.unwrap();

        let entries = repo.list(ContentKind::Post).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "post42");
        assert_eq!(
            repo.fetch_body(ContentKind::Post, "post42").await.unwrap(),
            b"# Hello"
        );
    }

    #[tokio::test]
    async fn test_reupsert_replaces_entry_in_place() {
        let store = Arc::new(MemoryBlobStore::new());
        let repo = repository(store.clone());

        for (id, title) in [("a", "First"), ("b", "Second"), ("c", "Third")] {
            repo.upsert(PUBLISH_KEY, post_request(Some(id), title, "CS", "body"))
                .await
                .unwrap();
        }
        repo.upsert(
            PUBLISH_KEY,
            post_request(Some("b"), "Second, revised", "Math", "new body"),
        )
        .await
        .unwrap();

        let entries = repo.list(ContentKind::Post).await.unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"], "catalog order must be preserved");
        assert_eq!(entries[1].title, "Second, revised");
        assert_eq!(entries[1].category, "Math");
        assert_eq!(
            repo.fetch_body(ContentKind::Post, "b").await.unwrap(),
            b"new body"
        );
    }

    #[tokio::test]
    async fn test_kinds_are_cataloged_separately() {
        let store = Arc::new(MemoryBlobStore::new());
        let repo = repository(store.clone());

        repo.upsert(PUBLISH_KEY, post_request(Some("p1"), "Post", "CS", "post"))
            .await
            .unwrap();
        repo.upsert(
            PUBLISH_KEY,
            UpsertRequest {
                kind: ContentKind::Note,
                id: Some("n1".to_string()),
                title: "Note".to_string(),
                category: "Life".to_string(),
                body: "note".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.list(ContentKind::Post).await.unwrap().len(), 1);
        assert_eq!(repo.list(ContentKind::Note).await.unwrap().len(), 1);
        assert_eq!(repo.list(ContentKind::Project).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_wrong_credential_writes_nothing() {
        let store = Arc::new(MemoryBlobStore::new());
        let repo = repository(store.clone());

        let result = repo
            .upsert("wrong-key", post_request(Some("post1"), "Hello", "CS", "# Hello"))
            .await;

        assert!(matches!(result, Err(ContentError::Unauthorized)));
        assert!(matches!(
            store.get("content/posts/post1.md").await,
            Err(BlobStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.get("content/posts.json").await,
            Err(BlobStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_publish_key_rejects_everything() {
        let store = Arc::new(MemoryBlobStore::new());
        let repo = ContentRepository::new(store, None);

        let result = repo
            .upsert("", post_request(Some("post1"), "Hello", "CS", "# Hello"))
            .await;
        assert!(matches!(result, Err(ContentError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_index_conflict_leaves_blob_committed() {
        let inner = MemoryBlobStore::new();
        let store = Arc::new(RacingIndexStore::new(inner.clone()));
        let repo = repository(store);

        let result = repo
            .upsert(PUBLISH_KEY, post_request(Some("post1"), "Hello", "CS", "# Hello"))
            .await;

        let (content_version, source) = match result {
            Err(ContentError::IndexUpdateFailed {
                content_version,
                source,
                ..
            }) => (content_version, source),
            other => panic!("expected IndexUpdateFailed, got {:?}", other),
        };
        assert!(matches!(source, BlobStoreError::Conflict { .. }));

        // Partial success is real: the blob write is not rolled back
        let blob = inner.get("content/posts/post1.md").await.unwrap();
        assert_eq!(blob.bytes, b"# Hello");
        assert_eq!(blob.version, content_version);

        // The rival's index write survived untouched
        let index = inner.get("content/posts.json").await.unwrap();
        let entries: Vec<IndexEntry> = serde_json::from_slice(&index.bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "rival");
    }

    #[tokio::test]
    async fn test_reissuing_after_conflict_succeeds() {
        let inner = MemoryBlobStore::new();
        let store = Arc::new(RacingIndexStore::new(inner.clone()));
        let repo = repository(store);
        let request = post_request(Some("post1"), "Hello", "CS", "# Hello");

        let first = repo.upsert(PUBLISH_KEY, request.clone()).await;
        assert!(matches!(
            first,
            Err(ContentError::IndexUpdateFailed { .. })
        ));

        // The same upsert replayed re-reads a fresh index and lands
        repo.upsert(PUBLISH_KEY, request).await.unwrap();

        let entries = repo.list(ContentKind::Post).await.unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["rival", "post1"]);
    }

    #[tokio::test]
    async fn test_corrupt_index_reports_committed_blob() {
        let store = Arc::new(MemoryBlobStore::new());
        store
            .put("content/posts.json", b"not json", None, "corrupt")
            .await
            .unwrap();
        let repo = repository(store);

        let result = repo
            .upsert(PUBLISH_KEY, post_request(Some("post1"), "Hello", "CS", "# Hello"))
            .await;

        match result {
            Err(ContentError::IndexReadFailed { id, .. }) => assert_eq!(id, "post1"),
            other => panic!("expected IndexReadFailed, got {:?}", other),
        }
        // The blob half of the operation had already landed
        assert_eq!(
            repo.fetch_body(ContentKind::Post, "post1").await.unwrap(),
            b"# Hello"
        );
    }

    #[tokio::test]
    async fn test_list_of_unwritten_kind_is_empty() {
        let store = Arc::new(MemoryBlobStore::new());
        let repo = repository(store);
        assert!(repo.list(ContentKind::Project).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_body_of_missing_item() {
        let store = Arc::new(MemoryBlobStore::new());
        let repo = repository(store);
        let result = repo.fetch_body(ContentKind::Post, "absent").await;
        assert!(matches!(result, Err(ContentError::NotFound { .. })));
    }

    #[test]
    fn test_generated_ids_distinct_for_distinct_times() {
        let a = generated_id(ContentKind::Post, 1754000000000);
        let b = generated_id(ContentKind::Post, 1754000000001);
        assert_eq!(a, "post1754000000000");
        assert_ne!(a, b);
    }

    #[test]
    fn test_merge_appends_then_replaces() {
        let mut entries = Vec::new();
        let first = IndexEntry {
            id: "post1".to_string(),
            title: "Hello".to_string(),
            category: "CS".to_string(),
            date: "2026-08-01".to_string(),
        };
        merge_entry(&mut entries, first.clone());
        assert_eq!(entries, vec![first]);

        let revised = IndexEntry {
            id: "post1".to_string(),
            title: "Hello again".to_string(),
            category: "CS".to_string(),
            date: "2026-08-06".to_string(),
        };
        merge_entry(&mut entries, revised.clone());
        assert_eq!(entries, vec![revised]);
    }
}
