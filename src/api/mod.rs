//! HTTP control surface
//!
//! Three endpoints drive the indexer, mirroring the contract the search
//! front-end expects:
//! - `GET /api/startIndexing` — accept a full run
//! - `GET /api/stopIndexing` — request cancellation
//! - `POST /api/indexPage?url=…` — re-index one URL
//!
//! Every response is `{"result": bool}` with an `error` string when
//! `result` is false.

use crate::indexing::IndexingCoordinator;
use crate::CrawldexError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

/// Structured body of every control-endpoint response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        Self {
            result: true,
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            result: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexPageParams {
    #[serde(default)]
    url: String,
}

/// Builds the API router around a coordinator
pub fn router(coordinator: IndexingCoordinator) -> Router {
    Router::new()
        .route("/api/startIndexing", get(start_indexing))
        .route("/api/stopIndexing", get(stop_indexing))
        .route("/api/indexPage", post(index_page))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

async fn start_indexing(State(coordinator): State<IndexingCoordinator>) -> Response {
    match coordinator.start_indexing() {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok())).into_response(),
        Err(e @ CrawldexError::AlreadyRunning) => {
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string()))).into_response()
        }
        Err(e) => internal_error(e),
    }
}

async fn stop_indexing(State(coordinator): State<IndexingCoordinator>) -> Response {
    match coordinator.stop_indexing() {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok())).into_response(),
        Err(e @ CrawldexError::NotRunning) => {
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string()))).into_response()
        }
        Err(e) => internal_error(e),
    }
}

async fn index_page(
    State(coordinator): State<IndexingCoordinator>,
    Query(params): Query<IndexPageParams>,
) -> Response {
    match coordinator.index_page(&params.url).await {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::ok())).into_response(),
        // The URL parsed but belongs to none of the configured sites
        Ok(false) => (
            StatusCode::OK,
            Json(ApiResponse::error("URL is outside configured sites")),
        )
            .into_response(),
        Err(CrawldexError::Url(_)) => {
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error("Invalid URL"))).into_response()
        }
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: CrawldexError) -> Response {
    tracing::error!(error = %e, "control endpoint failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(e.to_string())),
    )
        .into_response()
}
