//! GitHub contents-API implementation of BlobStore
//!
//! Stores each blob as a file in a GitHub repository. Every write becomes a
//! commit, and the file's `sha` doubles as the optimistic-concurrency
//! version token.

use crate::{BlobStore, BlobStoreError, BlobStoreResult, StoredBlob, VersionToken};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// GitHub contents-API implementation of BlobStore
///
/// Speaks HTTPS GET/PUT against `/repos/{owner}/{repo}/contents/{path}`
/// with bearer-token authentication.
#[derive(Debug, Clone)]
pub struct GitHubBlobStore {
    /// Repository owner (user or organization)
    owner: String,

    /// Repository name
    repo: String,

    /// API token with contents read/write access
    api_token: String,

    /// Base URL for the GitHub API
    api_base_url: String,

    /// HTTP client
    client: Client,
}

/// Request envelope for a contents-API PUT.
#[derive(Debug, Serialize)]
struct PutFileRequest<'a> {
    message: &'a str,
    content: String,
    /// Omitted entirely for first-time creation of a path.
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Response envelope shared by GET and PUT: base64 payload plus the
/// object's current `sha`.
#[derive(Debug, Deserialize)]
struct FileEnvelope {
    #[serde(default)]
    content: Option<String>,
    sha: String,
}

impl GitHubBlobStore {
    /// Create a new GitHubBlobStore instance
    pub fn new(owner: String, repo: String, api_token: String) -> Self {
        // Create a reqwest client with reasonable defaults
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("quill-store")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            owner,
            repo,
            api_token,
            api_base_url: "https://api.github.com".to_string(),
            client,
        }
    }

    /// Point the client at a different API host. Used by tests.
    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    /// Format the contents endpoint URL for a path
    fn contents_endpoint(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base_url, self.owner, self.repo, path
        )
    }

    /// Decode a base64 payload from the host. GitHub wraps the encoded
    /// content in newlines, which must be stripped before decoding.
    fn decode_content(path: &str, raw: &str) -> BlobStoreResult<Vec<u8>> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        base64::decode(&compact).map_err(|e| {
            BlobStoreError::Backend(anyhow::anyhow!(
                "invalid base64 payload for {}: {}",
                path,
                e
            ))
        })
    }
}

#[async_trait]
impl BlobStore for GitHubBlobStore {
    async fn get(&self, path: &str) -> BlobStoreResult<StoredBlob> {
        debug!("Fetching blob at {}", path);

        let url = self.contents_endpoint(path);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.into()))?;

        match response.status() {
            StatusCode::OK => {
                let envelope: FileEnvelope = response
                    .json()
                    .await
                    .map_err(|e| BlobStoreError::Backend(e.into()))?;
                let bytes =
                    Self::decode_content(path, envelope.content.as_deref().unwrap_or_default())?;
                Ok(StoredBlob {
                    bytes,
                    version: VersionToken::new(envelope.sha),
                })
            }
            StatusCode::NOT_FOUND => Err(BlobStoreError::NotFound(path.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                error!(
                    "Failed to fetch blob at {}: status {}, body: {}",
                    path, status, body
                );
                Err(BlobStoreError::BackendUnavailable {
                    path: path.to_string(),
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        expected: Option<&VersionToken>,
        message: &str,
    ) -> BlobStoreResult<VersionToken> {
        debug!("Writing blob at {} ({} bytes)", path, bytes.len());

        let request = PutFileRequest {
            message,
            content: base64::encode(bytes),
            sha: expected.map(|token| token.as_str()),
        };

        let url = self.contents_endpoint(path);
        let response = self
            .client
            .put(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Accept", "application/vnd.github+json")
            .json(&request)
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.into()))?;

        match response.status() {
            // 200 replaces an existing file, 201 creates a new one
            StatusCode::OK | StatusCode::CREATED => {
                let envelope: FileEnvelope = response
                    .json()
                    .await
                    .map_err(|e| BlobStoreError::Backend(e.into()))?;
                Ok(VersionToken::new(envelope.sha))
            }
            // GitHub signals a stale sha with 409 and a missing sha for an
            // existing file with 422; both mean the object moved on.
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(BlobStoreError::Conflict {
                    path: path.to_string(),
                })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!(
                    "Failed to write blob at {}: status {}, body: {}",
                    path, status, body
                );
                Err(BlobStoreError::BackendUnavailable {
                    path: path.to_string(),
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
