pub mod jobs;
pub mod search;

use axum::Router;
use axum::routing::get;

use super::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/jobs", get(jobs::list))
        .route("/{source}", get(search::run))
        .with_state(state);

    Router::new().nest("/api", api)
}
