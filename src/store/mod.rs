// Job Store: snapshot persistence per source.
// A snapshot is replaced wholesale; readers never see a mix of old and new
// rows for the same source.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::job::{JobFilters, JobRecord};

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Atomically replace every stored row for `source` with `jobs`.
    /// Returns the stored rows with their assigned ids, in input order.
    async fn replace_snapshot(
        &self,
        source: &str,
        jobs: &[JobRecord],
    ) -> Result<Vec<JobRecord>, StoreError>;

    /// Stored rows matching `filters`, ordered by id.
    async fn query(&self, filters: &JobFilters) -> Result<Vec<JobRecord>, StoreError>;

    /// Cheap availability probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
