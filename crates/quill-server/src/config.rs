//! Configuration for the Quill server
//!
//! This module contains the configuration types and loading functionality.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

use crate::error::{ServerError, ServerResult};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// URL of the content store: `github://{owner}/{repo}` or
    /// `memory://local`
    pub content_store_url: String,

    /// API token for the github:// store
    #[serde(default)]
    pub github_token: Option<String>,

    /// Secret the publish credential is matched against. When absent,
    /// publishing is disabled and every upsert is rejected.
    #[serde(default)]
    pub publish_key: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Override from environment variables
        if let Ok(port) = env::var("SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.port = port;
            } else {
                warn!("Invalid SERVER_PORT value: {}", port);
            }
        }

        if let Ok(host) = env::var("SERVER_HOST") {
            config.bind_address = host;
        }

        if let Ok(content_store_url) = env::var("CONTENT_STORE_URL") {
            config.content_store_url = content_store_url;
        }

        if let Ok(github_token) = env::var("GITHUB_TOKEN") {
            config.github_token = Some(github_token);
        }

        if let Ok(publish_key) = env::var("PUBLISH_KEY") {
            config.publish_key = Some(publish_key);
        }

        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.log_level = log_level;
        }

        // Validate required fields
        if config.content_store_url.is_empty() {
            return Err(ServerError::ConfigError(
                "Content store URL is required".to_string(),
            ));
        }

        if config.content_store_url.starts_with("github://") && config.github_token.is_none() {
            return Err(ServerError::ConfigError(
                "GITHUB_TOKEN is required for a github:// content store".to_string(),
            ));
        }

        // Warn for missing optional fields
        if config.publish_key.is_none() {
            warn!("No PUBLISH_KEY provided - publishing is disabled, all upserts will be rejected");
        }

        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            content_store_url: String::new(),
            github_token: None,
            publish_key: None,
            log_level: default_log_level(),
        }
    }
}
