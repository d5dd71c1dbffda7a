//! The search orchestrator.
//!
//! Tries a source's candidate URLs one at a time until one yields listings,
//! and falls back to synthetic records when candidates or the time budget run
//! out. A search never fails and never returns an empty list.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::extract::{Extraction, ListingExtractor};
use super::fallback::{Provenance, synthesize};
use super::fetcher::{FetchStrategy, FetchedPage, PageFetcher};
use crate::error::{FetchError, ScrapeError};
use crate::models::job::{JobRecord, SearchQuery};
use crate::sources::JobSource;
use crate::store::JobStore;

const STORE_PING_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-pipeline behaviour, fixed at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on records returned per search.
    pub max_results: usize,
    /// Number of synthetic records produced by the fallback.
    pub fallback_count: usize,
    /// End-to-end ceiling for one search.
    pub request_budget: Duration,
    /// Ceiling for a single candidate, retries included.
    pub candidate_timeout: Duration,
    /// Use the browser strategy first, falling back to plain HTTP.
    pub prefer_browser: bool,
    /// Treat a "no results" page as final instead of trying the remaining
    /// candidates.
    pub stop_on_no_results: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_results: 9,
            fallback_count: 3,
            request_budget: Duration::from_secs(12),
            candidate_timeout: Duration::from_secs(15),
            prefer_browser: false,
            stop_on_no_results: false,
        }
    }
}

/// Records plus the diagnostics the HTTP layer attaches to its response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub jobs: Vec<JobRecord>,
    pub timeout_occurred: bool,
    pub database_available: bool,
    /// Seconds.
    pub execution_time: f64,
    pub live_data: bool,
}

enum CandidateResult {
    Success(Vec<JobRecord>),
    Empty(ScrapeError),
    Failed(ScrapeError),
}

pub struct Pipeline {
    source: Arc<dyn JobSource>,
    extractor: ListingExtractor,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn JobStore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn JobSource>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn JobStore>,
        config: PipelineConfig,
    ) -> Self {
        let extractor = ListingExtractor::for_source(&*source);
        Self {
            source,
            extractor,
            fetcher,
            store,
            config,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        let started = Instant::now();
        let source = self.source.name();

        if !query.is_complete() {
            tracing::info!(source, error = %ScrapeError::InvalidQuery, "Serving example data");
            return self.fallback(query, Provenance::Example, started).await;
        }

        let budget = self.config.request_budget;
        for (attempt, url) in self.source.candidate_urls(query).iter().enumerate() {
            let url = url.as_str();
            let elapsed = started.elapsed();
            if elapsed >= budget {
                tracing::warn!(
                    source,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Request budget exhausted, serving fallback"
                );
                return self.fallback(query, Provenance::Timeout, started).await;
            }

            let ceiling = self.config.candidate_timeout.min(budget - elapsed);
            match self.try_candidate(url, query, ceiling).await {
                CandidateResult::Success(jobs) => {
                    tracing::info!(source, url, attempt, count = jobs.len(), "Candidate succeeded");
                    return self.persist(jobs, started).await;
                }
                CandidateResult::Empty(reason) => {
                    tracing::info!(source, url, attempt, reason = %reason, "Candidate returned no listings");
                    if self.config.stop_on_no_results
                        && matches!(reason, ScrapeError::NoResultsSignal { .. })
                    {
                        return self.fallback(query, Provenance::Example, started).await;
                    }
                }
                CandidateResult::Failed(reason) => {
                    tracing::warn!(source, url, attempt, error = %reason, "Candidate failed");
                }
            }
        }

        let provenance = if started.elapsed() >= budget {
            Provenance::Timeout
        } else {
            Provenance::Example
        };
        tracing::warn!(source, "All candidates exhausted, serving fallback");
        self.fallback(query, provenance, started).await
    }

    async fn try_candidate(
        &self,
        url: &str,
        query: &SearchQuery,
        ceiling: Duration,
    ) -> CandidateResult {
        let deadline = Instant::now() + ceiling;
        let page = match tokio::time::timeout(ceiling, self.fetch(url, deadline)).await {
            Err(_) => {
                return CandidateResult::Failed(ScrapeError::FetchTimeout {
                    url: url.to_string(),
                });
            }
            Ok(Err(e)) => return CandidateResult::Failed(ScrapeError::from_fetch(url, e)),
            Ok(Ok(page)) => page,
        };

        match self
            .extractor
            .extract(&page.html, query, self.config.max_results)
        {
            Extraction::Listings(jobs) => CandidateResult::Success(jobs),
            Extraction::NoResults { marker } => {
                CandidateResult::Empty(ScrapeError::NoResultsSignal {
                    url: url.to_string(),
                    marker: marker.to_string(),
                })
            }
            Extraction::Empty => CandidateResult::Empty(ScrapeError::ExtractionEmpty {
                url: url.to_string(),
            }),
        }
    }

    /// Preferred strategy first; a missing browser degrades to plain HTTP.
    async fn fetch(&self, url: &str, deadline: Instant) -> Result<FetchedPage, FetchError> {
        if !self.config.prefer_browser {
            return self.fetcher.fetch(url, FetchStrategy::Static, deadline).await;
        }
        let dynamic = FetchStrategy::Dynamic {
            ready_marker: self.source.ready_marker(),
        };
        match self.fetcher.fetch(url, dynamic, deadline).await {
            Err(FetchError::BrowserUnavailable(reason)) => {
                tracing::debug!(url, reason = %reason, "Browser unavailable, using static fetch");
                self.fetcher.fetch(url, FetchStrategy::Static, deadline).await
            }
            other => other,
        }
    }

    async fn persist(&self, mut jobs: Vec<JobRecord>, started: Instant) -> SearchOutcome {
        jobs.truncate(self.config.max_results.max(1));
        let (jobs, database_available) =
            match self.store.replace_snapshot(self.source.name(), &jobs).await {
                Ok(stored) => (stored, true),
                Err(e) => {
                    let e = ScrapeError::from(e);
                    tracing::warn!(source = self.source.name(), error = %e, "Returning unsaved results");
                    (jobs, false)
                }
            };
        self.finish(jobs, false, database_available, true, started)
    }

    async fn fallback(
        &self,
        query: &SearchQuery,
        provenance: Provenance,
        started: Instant,
    ) -> SearchOutcome {
        let count = self
            .config
            .fallback_count
            .clamp(1, self.config.max_results.max(1));
        let jobs = synthesize(&*self.source, query, count, provenance);
        let database_available = matches!(
            tokio::time::timeout(STORE_PING_TIMEOUT, self.store.ping()).await,
            Ok(Ok(()))
        );
        self.finish(
            jobs,
            provenance == Provenance::Timeout,
            database_available,
            false,
            started,
        )
    }

    fn finish(
        &self,
        jobs: Vec<JobRecord>,
        timeout_occurred: bool,
        database_available: bool,
        live_data: bool,
        started: Instant,
    ) -> SearchOutcome {
        let elapsed = started.elapsed();
        tracing::info!(
            source = self.source.name(),
            count = jobs.len(),
            live_data,
            timeout_occurred,
            database_available,
            elapsed_ms = elapsed.as_millis() as u64,
            "Search finished"
        );
        SearchOutcome {
            jobs,
            timeout_occurred,
            database_available,
            execution_time: elapsed.as_secs_f64(),
            live_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::StoreError;
    use crate::models::job::JobFilters;
    use crate::sources::get_source;
    use crate::store::MemoryJobStore;

    const LISTINGS: &str = r#"
        <article data-at="job-item">
          <a data-at="job-item-title" href="/stellenangebote--1.html">Elektriker (m/w/d)</a>
          <span data-at="job-item-company-name">Rhein Energie</span>
          <span data-at="job-item-location">Köln</span>
        </article>
        <article data-at="job-item">
          <a data-at="job-item-title" href="/stellenangebote--2.html">Elektroniker</a>
        </article>"#;

    const NO_RESULTS: &str = "<html><body><h1>Keine passenden Jobs gefunden</h1></body></html>";

    /// Answers by candidate position; unknown URLs fail with 404.
    struct ScriptedFetcher {
        pages: HashMap<String, Result<String, u16>>,
        calls: Mutex<Vec<(String, &'static str)>>,
        browser: bool,
    }

    impl ScriptedFetcher {
        fn new(urls: &[String], answers: Vec<Result<&str, u16>>) -> Self {
            let pages = urls
                .iter()
                .cloned()
                .zip(answers.into_iter().map(|a| a.map(String::from)))
                .collect();
            Self {
                pages,
                calls: Mutex::new(Vec::new()),
                browser: false,
            }
        }

        fn calls(&self) -> Vec<(String, &'static str)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(
            &self,
            url: &str,
            strategy: FetchStrategy,
            _deadline: Instant,
        ) -> Result<FetchedPage, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), strategy.label()));
            if matches!(strategy, FetchStrategy::Dynamic { .. }) && !self.browser {
                return Err(FetchError::BrowserUnavailable("not installed".into()));
            }
            match self.pages.get(url) {
                Some(Ok(html)) => Ok(FetchedPage {
                    url: url.to_string(),
                    html: html.clone(),
                    status: 200,
                    strategy,
                }),
                Some(Err(status)) => Err(FetchError::Status(*status)),
                None => Err(FetchError::Status(404)),
            }
        }
    }

    struct StalledFetcher;

    #[async_trait]
    impl PageFetcher for StalledFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _strategy: FetchStrategy,
            _deadline: Instant,
        ) -> Result<FetchedPage, FetchError> {
            std::future::pending().await
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl JobStore for BrokenStore {
        async fn replace_snapshot(&self, _: &str, _: &[JobRecord]) -> Result<Vec<JobRecord>, StoreError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn query(&self, _: &JobFilters) -> Result<Vec<JobRecord>, StoreError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::new("Elektriker", "Köln")
    }

    fn candidates() -> Vec<String> {
        get_source("stepstone").unwrap().candidate_urls(&query())
    }

    fn pipeline(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn JobStore>,
        config: PipelineConfig,
    ) -> Pipeline {
        Pipeline::new(get_source("stepstone").unwrap(), fetcher, store, config)
    }

    #[tokio::test]
    async fn incomplete_query_returns_fallback_without_fetching() {
        let fetcher = Arc::new(ScriptedFetcher::new(&[], vec![]));
        let p = pipeline(fetcher.clone(), Arc::new(MemoryJobStore::new()), PipelineConfig::default());

        let empty = SearchQuery::new("", "");
        let first = p.search(&empty).await;
        let second = p.search(&empty).await;

        let source = get_source("stepstone").unwrap();
        assert_eq!(first.jobs, synthesize(&*source, &empty, 3, Provenance::Example));
        assert_eq!(first.jobs, second.jobs);
        assert!(!first.live_data);
        assert!(!first.timeout_occurred);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn advances_past_failures_and_persists_first_success() {
        let urls = candidates();
        let fetcher = Arc::new(ScriptedFetcher::new(&urls, vec![Err(503), Ok(LISTINGS)]));
        let store = Arc::new(MemoryJobStore::new());
        let p = pipeline(fetcher.clone(), store.clone(), PipelineConfig::default());

        let outcome = p.search(&query()).await;

        assert!(outcome.live_data);
        assert!(outcome.database_available);
        assert_eq!(outcome.jobs.len(), 2);
        assert!(outcome.jobs.iter().all(|j| j.id.is_some() && j.source == "stepstone"));
        assert_eq!(fetcher.calls().len(), 2);

        let stored = store.query(&JobFilters::default()).await.unwrap();
        assert_eq!(stored, outcome.jobs);
    }

    #[tokio::test]
    async fn no_results_page_skips_to_next_candidate_by_default() {
        let urls = candidates();
        let fetcher = Arc::new(ScriptedFetcher::new(&urls, vec![Ok(NO_RESULTS), Ok(LISTINGS)]));
        let p = pipeline(fetcher.clone(), Arc::new(MemoryJobStore::new()), PipelineConfig::default());

        let outcome = p.search(&query()).await;
        assert!(outcome.live_data);
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn no_results_page_can_be_authoritative() {
        let urls = candidates();
        let fetcher = Arc::new(ScriptedFetcher::new(&urls, vec![Ok(NO_RESULTS), Ok(LISTINGS)]));
        let config = PipelineConfig {
            stop_on_no_results: true,
            ..PipelineConfig::default()
        };
        let p = pipeline(fetcher.clone(), Arc::new(MemoryJobStore::new()), config);

        let outcome = p.search(&query()).await;
        assert!(!outcome.live_data);
        assert_eq!(fetcher.calls().len(), 1);
        assert!(outcome.jobs.iter().all(|j| j.source == "stepstone-example"));
    }

    #[tokio::test]
    async fn exhausted_candidates_yield_example_records() {
        let fetcher = Arc::new(ScriptedFetcher::new(&[], vec![]));
        let p = pipeline(fetcher.clone(), Arc::new(MemoryJobStore::new()), PipelineConfig::default());

        let outcome = p.search(&query()).await;

        assert_eq!(fetcher.calls().len(), candidates().len());
        assert!(!outcome.live_data);
        assert!(!outcome.timeout_occurred);
        assert!((1..=3).contains(&outcome.jobs.len()));
        for job in &outcome.jobs {
            assert!(job.title.contains("Elektriker"));
            assert_eq!(job.location, "Köln");
            assert!(job.is_well_formed());
        }
    }

    #[tokio::test]
    async fn stalled_candidates_hit_the_budget() {
        let config = PipelineConfig {
            request_budget: Duration::from_millis(200),
            candidate_timeout: Duration::from_millis(150),
            ..PipelineConfig::default()
        };
        let p = pipeline(Arc::new(StalledFetcher), Arc::new(MemoryJobStore::new()), config.clone());

        let started = Instant::now();
        let outcome = p.search(&query()).await;

        assert!(outcome.timeout_occurred);
        assert!(!outcome.jobs.is_empty());
        assert!(outcome.jobs.iter().all(|j| j.source == "stepstone-timeout"));
        let limit = config.request_budget + config.candidate_timeout;
        assert!(started.elapsed() <= limit + Duration::from_millis(100));
        assert!(outcome.execution_time <= limit.as_secs_f64() + 0.1);
    }

    #[tokio::test]
    async fn browser_preference_degrades_to_static() {
        let urls = candidates();
        let fetcher = Arc::new(ScriptedFetcher::new(&urls, vec![Ok(LISTINGS)]));
        let config = PipelineConfig {
            prefer_browser: true,
            ..PipelineConfig::default()
        };
        let p = pipeline(fetcher.clone(), Arc::new(MemoryJobStore::new()), config);

        let outcome = p.search(&query()).await;
        assert!(outcome.live_data);
        let strategies: Vec<_> = fetcher.calls().into_iter().map(|(_, s)| s).collect();
        assert_eq!(strategies, ["dynamic", "static"]);
    }

    #[tokio::test]
    async fn store_failure_still_returns_live_records() {
        let urls = candidates();
        let fetcher = Arc::new(ScriptedFetcher::new(&urls, vec![Ok(LISTINGS)]));
        let p = pipeline(fetcher, Arc::new(BrokenStore), PipelineConfig::default());

        let outcome = p.search(&query()).await;
        assert!(outcome.live_data);
        assert!(!outcome.database_available);
        assert_eq!(outcome.jobs.len(), 2);
        assert!(outcome.jobs.iter().all(|j| j.id.is_none()));
    }

    #[tokio::test]
    async fn results_never_exceed_the_cap() {
        let many: String = (0..20)
            .map(|i| format!(r#"<article><h2><a href="/job/{i}">Elektriker {i}</a></h2></article>"#))
            .collect();
        let urls = candidates();
        let fetcher = Arc::new(ScriptedFetcher::new(&urls, vec![Ok(many.as_str())]));
        let config = PipelineConfig {
            max_results: 4,
            ..PipelineConfig::default()
        };
        let p = pipeline(fetcher, Arc::new(MemoryJobStore::new()), config);

        let outcome = p.search(&query()).await;
        assert_eq!(outcome.jobs.len(), 4);
    }

    #[derive(Default)]
    struct DeadlineRecorder {
        deadlines: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl PageFetcher for DeadlineRecorder {
        async fn fetch(
            &self,
            _url: &str,
            _strategy: FetchStrategy,
            deadline: Instant,
        ) -> Result<FetchedPage, FetchError> {
            self.deadlines.lock().unwrap().push(deadline);
            Err(FetchError::Status(404))
        }
    }

    #[tokio::test]
    async fn fetch_deadlines_stay_inside_the_budget() {
        let fetcher = Arc::new(DeadlineRecorder::default());
        let config = PipelineConfig {
            request_budget: Duration::from_millis(300),
            candidate_timeout: Duration::from_secs(10),
            ..PipelineConfig::default()
        };
        let p = pipeline(fetcher.clone(), Arc::new(MemoryJobStore::new()), config);

        let started = Instant::now();
        p.search(&query()).await;
        let latest = started + Duration::from_millis(300);

        let deadlines = fetcher.deadlines.lock().unwrap().clone();
        assert_eq!(deadlines.len(), candidates().len());
        assert!(deadlines.iter().all(|d| *d <= latest + Duration::from_millis(20)));
    }
}
