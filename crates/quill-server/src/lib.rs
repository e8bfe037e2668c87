//!
//! Quill server - HTTP publishing API for the Quill content repository
//!
//! This module exports all the components of the Quill server.

use std::sync::Arc;

/// API module
pub mod api;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

/// Server module
pub mod server;

// Re-export key types
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::QuillServer;

use quill_content::ContentRepository;
use quill_store::BlobStore;

/// Run function
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    // Initialize logging
    init_logging(&config);

    // Create dependencies
    let store = create_blob_store(&config)?;
    let content = Arc::new(ContentRepository::new(store, config.publish_key.clone()));

    // Create and run server
    let server = QuillServer::new(config, content);
    server.run().await
}

/// Initialize logging
fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    // Create filter based on config
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Initialize subscriber
    fmt().with_env_filter(filter).with_target(true).init();
}

/// Create the blob store the content repository writes through
fn create_blob_store(config: &ServerConfig) -> ServerResult<Arc<dyn BlobStore>> {
    if config.content_store_url.starts_with("memory://") {
        // In-memory store for development and testing
        tracing::info!("Using in-memory blob store");
        Ok(Arc::new(quill_store::memory::MemoryBlobStore::new()))
    } else if let Some(rest) = config.content_store_url.strip_prefix("github://") {
        // Format: github://{owner}/{repo}
        let mut parts = rest.splitn(2, '/');
        let owner = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ServerError::ConfigError("Missing owner in github:// store URL".to_string())
            })?;
        let repo = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ServerError::ConfigError("Missing repository in github:// store URL".to_string())
            })?;
        let token = config.github_token.clone().ok_or_else(|| {
            ServerError::ConfigError("GITHUB_TOKEN is required for a github:// store".to_string())
        })?;

        tracing::info!("Using GitHub content repository {}/{}", owner, repo);
        Ok(Arc::new(quill_store::github::GitHubBlobStore::new(
            owner.to_string(),
            repo.to_string(),
            token,
        )))
    } else {
        Err(ServerError::ConfigError(format!(
            "Unsupported content store URL: {}",
            config.content_store_url
        )))
    }
}
