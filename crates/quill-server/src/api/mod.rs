//! API module for the Quill server
//!
//! This module contains the API routes and handlers.

use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod errors;

use crate::error::ServerError;
use crate::server::QuillServer;
use quill_content::{ContentKind, UpsertRequest};

/// Build the router for API endpoints
pub fn build_router(server: Arc<QuillServer>) -> Router {
    Router::new()
        // Content publishing and reads
        .route("/v1/content", post(handle_upsert_content))
        .route("/v1/content/:kind", get(handle_list_content))
        .route("/v1/content/:kind/:id", get(handle_get_content))
        // Health check
        .route("/health", get(health_check))
        // The site front end publishes from the browser
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        // Shared state
        .with_state(server)
}

/// Request to insert or update one content item
#[derive(Debug, Serialize, Deserialize)]
struct UpsertContentRequest {
    kind: String,
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    category: String,
    body: String,
    credential: String,
}

impl UpsertContentRequest {
    /// Echo of the request for diagnostic bodies, credential masked.
    fn redacted(&self) -> serde_json::Value {
        json!({
            "kind": self.kind,
            "id": self.id,
            "title": self.title,
            "category": self.category,
            "body": self.body,
            "credential": "******",
        })
    }
}

/// Handler for upserting a content item
async fn handle_upsert_content(
    State(server): State<Arc<QuillServer>>,
    Json(request): Json<UpsertContentRequest>,
) -> Response {
    let kind: ContentKind = match request.kind.parse() {
        Ok(kind) => kind,
        Err(e) => {
            return errors::api_error_response(
                &ServerError::ValidationError(format!("{}", e)),
                None,
            )
        }
    };

    let upsert = UpsertRequest {
        kind,
        id: request.id.clone(),
        title: request.title.clone(),
        category: request.category.clone(),
        body: request.body.clone(),
    };

    match server.content().upsert(&request.credential, upsert).await {
        Ok(receipt) => (
            StatusCode::OK,
            axum::Json(json!({
                "id": receipt.id,
                "message": format!("{} saved successfully", kind),
            })),
        )
            .into_response(),
        Err(err) => errors::api_error_response(&ServerError::from(err), Some(request.redacted())),
    }
}

/// Handler for listing a kind's index entries
async fn handle_list_content(
    State(server): State<Arc<QuillServer>>,
    Path(kind): Path<String>,
) -> Response {
    let kind: ContentKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => {
            return errors::api_error_response(
                &ServerError::ValidationError(format!("{}", e)),
                None,
            )
        }
    };

    match server.content().list(kind).await {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => errors::api_error_response(&ServerError::from(err), None),
    }
}

/// Handler for fetching one item's raw body
async fn handle_get_content(
    State(server): State<Arc<QuillServer>>,
    Path((kind, id)): Path<(String, String)>,
) -> Response {
    let kind: ContentKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => {
            return errors::api_error_response(
                &ServerError::ValidationError(format!("{}", e)),
                None,
            )
        }
    };

    match server.content().fetch_body(kind, &id).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(err) => errors::api_error_response(&ServerError::from(err), None),
    }
}

/// Handler for the health check endpoint
async fn health_check() -> Response {
    (StatusCode::OK, axum::Json(json!({ "status": "healthy" }))).into_response()
}
