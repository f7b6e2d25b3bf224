//! # Read API
//!
//! Thin JSON handlers over `ReadPath`. Every response body uses the
//! `{success, data, error}` envelope.

use crate::live_logic::downstream::ws_handler;
use crate::live_logic::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures_util::{Stream, StreamExt};
use lib_live::{Match, ReadError};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

#[derive(Debug, Serialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()) }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Match not found")]
    NotFound,
    #[error("{0}")]
    Internal(String),
}

impl From<ReadError> for AppError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::NotFound => AppError::NotFound,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(message) => {
                error!("Read API failure: {}", message);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

/// All routes of the service, with CORS open to any origin.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/matches", get(list_matches_handler))
        .route("/api/matches/{id}", get(get_match_handler))
        .route("/api/matches/{id}/events/stream", get(event_stream_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("OK"))
}

async fn list_matches_handler(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Match>>>, AppError> {
    let matches = state.read.list_matches().await?;
    Ok(Json(ApiResponse::ok(matches)))
}

async fn get_match_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Match>>, AppError> {
    let found = state.read.get_match(&id).await?;
    Ok(Json(ApiResponse::ok(found)))
}

/// One `data:` line per event of the match, until the client goes away or the
/// server shuts down.
async fn event_stream_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let events = state.read.event_stream(&id).await?;
    let shutdown = state.shutdown.clone();
    let stream = events
        .take_until(async move { shutdown.cancelled().await })
        .map(|event| Event::default().json_data(event));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
