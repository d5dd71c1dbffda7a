use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const CREATE_JOBS_TABLE: &str = "CREATE TABLE IF NOT EXISTS jobs (
    id SERIAL PRIMARY KEY,
    title VARCHAR(200) NOT NULL,
    company VARCHAR(200) NOT NULL,
    location VARCHAR(200) NOT NULL,
    url VARCHAR(200) NOT NULL,
    source VARCHAR(200) NOT NULL
)";

/// Build a pool without connecting. A database that is down at startup only
/// degrades persistence instead of preventing the server from booting.
pub fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_lazy(database_url)
}

/// Create the `jobs` table if it does not exist. Idempotent.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_JOBS_TABLE).execute(pool).await?;
    Ok(())
}
