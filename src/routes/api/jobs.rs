use axum::Json;
use axum::extract::{Query, State};

use crate::error::AppError;
use crate::models::job::{JobFilters, JobRecord};
use crate::routes::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<JobFilters>,
) -> Result<Json<Vec<JobRecord>>, AppError> {
    let jobs = state.store().query(&filters).await?;
    Ok(Json(jobs))
}
