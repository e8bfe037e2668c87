//! Main Quill server implementation

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use quill_content::ContentRepository;

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Main server implementation
#[derive(Clone)]
pub struct QuillServer {
    /// Configuration
    pub config: ServerConfig,

    /// Content repository
    content: Arc<ContentRepository>,
}

impl std::fmt::Debug for QuillServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuillServer")
            .field("content", &self.content)
            .finish()
    }
}

impl QuillServer {
    /// Create a new QuillServer
    pub fn new(config: ServerConfig, content: Arc<ContentRepository>) -> Self {
        Self { config, content }
    }

    /// The content repository behind the API
    pub fn content(&self) -> &ContentRepository {
        &self.content
    }

    /// Run the server
    pub async fn run(self) -> ServerResult<()> {
        info!("Starting Quill server");

        // Build the API router
        let addr = (self.config.bind_address.clone(), self.config.port);
        let app = crate::api::build_router(Arc::new(self));

        // Create and bind the TCP listener
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
