//! Page retrieval: the [`PageFetcher`] seam, the shared retry policy, and
//! [`SiteFetcher`], which dispatches to the static or browser strategy.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};

use super::browser::BrowserFetcher;
use super::http::HttpFetcher;
use crate::error::FetchError;

/// How a candidate page is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Plain HTTP GET of server-rendered markup.
    Static,
    /// Headless browser session; waits for `ready_marker` before capturing.
    Dynamic { ready_marker: &'static str },
}

impl FetchStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            FetchStrategy::Static => "static",
            FetchStrategy::Dynamic { .. } => "dynamic",
        }
    }
}

/// A successfully retrieved page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
    pub status: u16,
    pub strategy: FetchStrategy,
}

/// Retrieves the HTML behind a candidate URL. Implementations must give up,
/// and release whatever they hold, by `deadline`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        strategy: FetchStrategy,
        deadline: Instant,
    ) -> Result<FetchedPage, FetchError>;
}

/// Attempts and backoff shared by both strategies. Only errors for which
/// [`FetchError::is_retryable`] holds are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            min_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .with_jitter()
    }

    /// Run `attempt` until it succeeds, fails permanently, attempts run out,
    /// or `deadline` passes.
    pub async fn run<T, F, Fut>(
        &self,
        url: &str,
        strategy: &'static str,
        deadline: Instant,
        attempt: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        attempt
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(move |err: &FetchError| err.is_retryable() && Instant::now() < deadline)
            .notify(|err: &FetchError, delay: Duration| {
                tracing::warn!(
                    url,
                    strategy,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying page fetch"
                );
            })
            .await
    }
}

/// Production fetcher. The browser strategy is optional; without it a
/// dynamic request fails with [`FetchError::BrowserUnavailable`] so the
/// caller can fall back to the static strategy.
pub struct SiteFetcher {
    http: HttpFetcher,
    browser: Option<BrowserFetcher>,
    retry: RetryPolicy,
}

impl SiteFetcher {
    pub fn new(http: HttpFetcher, browser: Option<BrowserFetcher>, retry: RetryPolicy) -> Self {
        Self {
            http,
            browser,
            retry,
        }
    }
}

#[async_trait]
impl PageFetcher for SiteFetcher {
    async fn fetch(
        &self,
        url: &str,
        strategy: FetchStrategy,
        deadline: Instant,
    ) -> Result<FetchedPage, FetchError> {
        match strategy {
            FetchStrategy::Static => {
                self.retry
                    .run(url, strategy.label(), deadline, || self.http.get(url, deadline))
                    .await
            }
            FetchStrategy::Dynamic { ready_marker } => {
                let Some(browser) = &self.browser else {
                    return Err(FetchError::BrowserUnavailable(
                        "browser strategy disabled".to_string(),
                    ));
                };
                self.retry
                    .run(url, strategy.label(), deadline, || {
                        browser.render(url, ready_marker, deadline)
                    })
                    .await
            }
        }
    }
}
