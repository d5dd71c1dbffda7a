pub mod api;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::scrape::Pipeline;
use crate::store::JobStore;

/// Shared handler state: one pipeline per source plus the store they write to.
#[derive(Clone)]
pub struct AppState {
    pipelines: Arc<HashMap<&'static str, Arc<Pipeline>>>,
    store: Arc<dyn JobStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn JobStore>, pipelines: impl IntoIterator<Item = Pipeline>) -> Self {
        let pipelines = pipelines
            .into_iter()
            .map(|p| (p.source_name(), Arc::new(p)))
            .collect();
        Self {
            pipelines: Arc::new(pipelines),
            store,
        }
    }

    pub fn pipeline(&self, source: &str) -> Option<Arc<Pipeline>> {
        self.pipelines.get(source).cloned()
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

/// The full application: probes, API, and the search page served from
/// `static_dir` when one is given.
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state.clone())
        .merge(api::router(state));

    if let Some(dir) = static_dir {
        let files = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(files);
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
