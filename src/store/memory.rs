use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::JobStore;
use crate::error::StoreError;
use crate::models::job::{JobFilters, JobRecord};

#[derive(Default)]
struct Snapshots {
    next_id: i32,
    by_source: HashMap<String, Vec<JobRecord>>,
}

/// Process-local store used when no database is configured.
/// Each replace happens under one write lock, so it is atomic to readers.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: RwLock<Snapshots>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn replace_snapshot(
        &self,
        source: &str,
        jobs: &[JobRecord],
    ) -> Result<Vec<JobRecord>, StoreError> {
        let mut state = self.inner.write().await;
        let mut stored = Vec::with_capacity(jobs.len());
        for job in jobs {
            state.next_id += 1;
            stored.push(JobRecord {
                id: Some(state.next_id),
                source: source.to_string(),
                ..job.clone()
            });
        }
        state.by_source.insert(source.to_string(), stored.clone());
        tracing::debug!(source, count = stored.len(), "Replaced in-memory snapshot");
        Ok(stored)
    }

    async fn query(&self, filters: &JobFilters) -> Result<Vec<JobRecord>, StoreError> {
        let filters = filters.normalized();
        let state = self.inner.read().await;
        let mut jobs: Vec<JobRecord> = state
            .by_source
            .values()
            .flatten()
            .filter(|job| filters.matches(job))
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
