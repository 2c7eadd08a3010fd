//! Local page server.
//!
//! Serves the rendered workbench page and the media blobs it references, so
//! results can be inspected in a browser. Blobs are looked up in the live
//! registry on each request; a released blob answers 404.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::render::page::{BlobLinks, PageOptions};
use crate::workflow::{Controller, WorkflowState};

pub const BLOB_ROUTE_PREFIX: &str = "/blobs/";

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: SocketAddr, reason: String },
    #[error("server error: {0}")]
    Serve(String),
}

#[derive(Clone)]
struct PageState {
    controller: Arc<Controller>,
    options: Arc<PageOptions>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    state: &'static str,
    file: Option<String>,
    blobs: usize,
}

/// Build the router. `options.blob_links` is overridden to link blobs
/// through this server.
pub fn create_router(controller: Arc<Controller>, options: PageOptions) -> Router {
    let options = PageOptions {
        blob_links: BlobLinks::Served {
            prefix: BLOB_ROUTE_PREFIX.to_string(),
        },
        ..options
    };
    Router::new()
        .route("/", get(page_handler))
        .route("/status", get(status_handler))
        .route("/blobs/{id}", get(blob_handler))
        .with_state(PageState {
            controller,
            options: Arc::new(options),
        })
}

async fn page_handler(State(state): State<PageState>) -> Html<String> {
    Html(state.controller.render_page(&state.options))
}

async fn status_handler(State(state): State<PageState>) -> Json<StatusResponse> {
    let controller = &state.controller;
    Json(StatusResponse {
        state: match controller.state() {
            WorkflowState::Empty => "empty",
            WorkflowState::OriginalLoaded => "original_loaded",
            WorkflowState::Preprocessed => "preprocessed",
            WorkflowState::Augmented => "augmented",
        },
        file: controller.active_file().map(|f| f.filename().to_string()),
        blobs: controller.with_surface(|s| s.blobs().len()),
    })
}

async fn blob_handler(State(state): State<PageState>, Path(id): Path<String>) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let blob = state
        .controller
        .with_surface(|surface| surface.blobs().get(&id).cloned());
    match blob {
        Some(blob) => ([(header::CONTENT_TYPE, blob.mime)], blob.bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve until Ctrl-C.
pub async fn serve(
    controller: Arc<Controller>,
    options: PageOptions,
    bind: &str,
    port: u16,
) -> Result<(), ServeError> {
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .map_err(|e: std::net::AddrParseError| ServeError::InvalidAddress(e.to_string()))?;

    let app = create_router(controller, options);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServeError::Bind {
            addr,
            reason: e.to_string(),
        })?;
    let local = listener.local_addr().unwrap_or(addr);
    tracing::info!(address = %local, "serving workbench page");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            }
        })
        .await
        .map_err(|e| ServeError::Serve(e.to_string()))?;

    tracing::info!("page server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, FixtureTransport};
    use crate::media::UploadedFile;

    async fn spawn(controller: Arc<Controller>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(controller, PageOptions::default());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_page_links_served_blobs() {
        let controller = Arc::new(Controller::new(ApiClient::new(Arc::new(
            FixtureTransport::new(),
        ))));
        controller
            .select_file(UploadedFile::new("photo.png", vec![0u8; 8]))
            .await
            .unwrap();
        let addr = spawn(controller.clone()).await;

        let page = reqwest::get(format!("http://{addr}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let start = page.find("src=\"/blobs/").unwrap() + "src=\"".len();
        let end = start + page[start..].find('"').unwrap();
        let blob_path = &page[start..end];

        let resp = reqwest::get(format!("http://{addr}{blob_path}")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "image/png");
    }

    #[tokio::test]
    async fn test_unknown_blob_is_404() {
        let controller = Arc::new(Controller::new(ApiClient::new(Arc::new(
            FixtureTransport::new(),
        ))));
        let addr = spawn(controller).await;
        let resp = reqwest::get(format!("http://{addr}/blobs/{}", Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);

        let resp = reqwest::get(format!("http://{addr}/blobs/not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_status_reports_state() {
        let controller = Arc::new(Controller::new(ApiClient::new(Arc::new(
            FixtureTransport::new(),
        ))));
        let addr = spawn(controller).await;
        let body: serde_json::Value = reqwest::get(format!("http://{addr}/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["state"], "empty");
        assert!(body["file"].is_null());
    }
}
