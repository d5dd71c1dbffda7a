use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::JobStore;
use crate::db;
use crate::error::StoreError;
use crate::models::job::{JobFilters, JobRecord};

/// SQLSTATE for "relation does not exist".
const UNDEFINED_TABLE: &str = "42P01";

const JOB_COLUMNS: &str = "id, title, company, location, url, source";

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete-then-insert inside one transaction. Concurrent replaces of the
    /// same source queue on a transaction-scoped advisory lock.
    async fn replace_once(
        &self,
        source: &str,
        jobs: &[JobRecord],
    ) -> Result<Vec<JobRecord>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM jobs WHERE source = $1")
            .bind(source)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut stored = Vec::with_capacity(jobs.len());
        for job in jobs {
            let row = sqlx::query_as::<_, JobRecord>(&format!(
                "INSERT INTO jobs (title, company, location, url, source) VALUES ($1, $2, $3, $4, $5) RETURNING {JOB_COLUMNS}"
            ))
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.location)
            .bind(&job.url)
            .bind(source)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(row);
        }

        tx.commit().await?;
        tracing::info!(source, deleted, inserted = stored.len(), "Replaced snapshot");
        Ok(stored)
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn replace_snapshot(
        &self,
        source: &str,
        jobs: &[JobRecord],
    ) -> Result<Vec<JobRecord>, StoreError> {
        match self.replace_once(source, jobs).await {
            Err(e) if is_undefined_table(&e) => {
                tracing::warn!("jobs table missing, creating it");
                db::ensure_schema(&self.pool).await?;
                Ok(self.replace_once(source, jobs).await?)
            }
            other => Ok(other?),
        }
    }

    async fn query(&self, filters: &JobFilters) -> Result<Vec<JobRecord>, StoreError> {
        let filters = filters.normalized();
        match filter_query(&filters)
            .build_query_as::<JobRecord>()
            .fetch_all(&self.pool)
            .await
        {
            Ok(jobs) => Ok(jobs),
            // No table yet means nothing has been stored.
            Err(e) if is_undefined_table(&e) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_undefined_table(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNDEFINED_TABLE))
}

fn filter_query(filters: &JobFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM jobs WHERE 1=1"));
    if let Some(title) = &filters.title {
        qb.push(" AND title ILIKE ")
            .push_bind(format!("%{}%", escape_like(title)));
    }
    if let Some(city) = &filters.city {
        qb.push(" AND location ILIKE ")
            .push_bind(format!("%{}%", escape_like(city)));
    }
    if let Some(source) = &filters.source {
        qb.push(" AND source = ").push_bind(source.clone());
    }
    qb.push(" ORDER BY id");
    qb
}

/// Escape LIKE wildcards so user input only ever matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
