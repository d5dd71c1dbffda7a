use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors produced while retrieving a single candidate page.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),
}

impl FetchError {
    /// Connect/read failures are worth another attempt; a definite answer
    /// from the server (or a missing browser) is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Transport(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(Duration::ZERO)
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Persistence failures. Callers treat every variant as "store unavailable".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Why a pipeline step produced no live records. Every variant is recovered
/// inside the pipeline; they surface only in logs and diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("fetch of {url} timed out")]
    FetchTimeout { url: String },

    #[error("fetch of {url} failed: {message}")]
    FetchTransport { url: String, message: String },

    #[error("{url} reports no results ({marker:?})")]
    NoResultsSignal { url: String, marker: String },

    #[error("no listings matched any selector on {url}")]
    ExtractionEmpty { url: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("query is incomplete")]
    InvalidQuery,
}

impl ScrapeError {
    pub fn from_fetch(url: &str, err: FetchError) -> Self {
        match err {
            FetchError::Timeout(_) => ScrapeError::FetchTimeout {
                url: url.to_string(),
            },
            other => ScrapeError::FetchTransport {
                url: url.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database unavailable".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
