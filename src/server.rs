//! HTTP interface for the search service.
//!
//! ## Endpoints
//!
//! - `POST /search` - New search from a JSON body, or the next page when an
//!   `X-Session-Id` header is sent (the body is then ignored)
//! - `POST /` - Same as `POST /search`, for the browser form
//! - `GET /search/next` - Next page for the `X-Session-Id` header
//! - `DELETE /search` - End the `X-Session-Id` session
//! - `GET /languages` - Language codes with a dictionary
//! - `GET /health` - Liveness
//!
//! Every page response carries the session token in both the JSON body and the
//! `X-Session-Id` response header.

use crate::criteria::{Language, SearchRequest};
use crate::error::SearchError;
use crate::service::SearchService;
use crate::session::SearchPage;
use crate::debug_log;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::CorsLayer;

pub const SESSION_HEADER: &str = "x-session-id";

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

type AppState = Arc<SearchService>;

/// Error returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    Search(SearchError),
    Internal(String),
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        Self::Search(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Search(err) => {
                let status = match &err {
                    SearchError::InvalidCriteria(_) => StatusCode::BAD_REQUEST,
                    SearchError::UnsupportedLanguage(_) | SearchError::SessionNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    SearchError::DictionaryLoad { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let body = ErrorBody {
                    error: err.code(),
                    message: err.to_string(),
                };
                (status, body)
            }
            Self::Internal(message) => {
                log::error!("Request failed: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal",
                        message,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router with all routes and a permissive CORS layer for the browser form.
pub fn build_router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/", post(search))
        .route("/search", post(search).delete(end_search))
        .route("/search/next", get(next_page))
        .route("/languages", get(languages))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn page_response(page: SearchPage) -> Response {
    let token = page.session.to_string();
    ([(SESSION_HEADER, token)], Json(page)).into_response()
}

/// POST /search - start a search, or continue the one named by the header
async fn search(
    State(service): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let token = session_header(&headers);
    let request = match (body, &token) {
        (Ok(Json(request)), _) => Some(request),
        // A continuation does not read the body.
        (Err(_), Some(_)) => None,
        (Err(rejection), None) => {
            return Err(SearchError::InvalidCriteria(rejection.body_text()).into());
        }
    };
    debug_log!(
        "POST /search token={:?} criteria={}",
        token,
        request.is_some()
    );

    // Dictionary loading and matching are CPU/IO bound.
    let page = tokio::task::spawn_blocking(move || service.search(request.as_ref(), token.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(format!("search task failed: {e}")))??;
    Ok(page_response(page))
}

/// GET /search/next - next page of an existing session
async fn next_page(
    State(service): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = session_header(&headers).unwrap_or_default();
    let page = service.next_page(&token)?;
    Ok(page_response(page))
}

/// DELETE /search - end a session
async fn end_search(
    State(service): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = session_header(&headers).unwrap_or_default();
    service.end_session(&token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /languages - codes with a dictionary available
async fn languages(State(service): State<AppState>) -> Json<Vec<Language>> {
    Json(service.available_languages())
}

async fn health() -> &'static str {
    "ok"
}

/// Periodically remove idle sessions until the runtime shuts down.
pub fn spawn_session_sweeper(service: Arc<SearchService>) -> JoinHandle<()> {
    let period = service.config().sweep_interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            service.sweep_expired();
        }
    })
}

/// Serve until Ctrl-C.
pub async fn serve(bind: SocketAddr, service: Arc<SearchService>) -> std::io::Result<()> {
    let sweeper = spawn_session_sweeper(Arc::clone(&service));
    let listener = TcpListener::bind(bind).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    let result = axum::serve(listener, build_router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweeper.abort();
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
