use axum::Json;
use axum::extract::{Path, Query, State};

use crate::error::AppError;
use crate::models::job::SearchQuery;
use crate::routes::AppState;
use crate::scrape::SearchOutcome;

/// Run the search pipeline for one source. Always answers with records;
/// only an unknown source is an error.
pub async fn run(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchOutcome>, AppError> {
    let pipeline = state
        .pipeline(&source)
        .ok_or_else(|| AppError::NotFound(format!("Unknown source '{source}'")))?;
    let query = SearchQuery::new(&query.title, &query.city);
    Ok(Json(pipeline.search(&query).await))
}
