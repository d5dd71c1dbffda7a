use std::time::{Duration, Instant};

use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use super::fetcher::{FetchStrategy, FetchedPage};
use crate::error::FetchError;

/// Desktop browser identities rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

pub(crate) fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Static strategy: a single GET with browser-like headers.
pub struct HttpFetcher {
    client: reqwest::Client,
    read_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            read_timeout,
        })
    }

    /// Fetch `url`. Anything but 200 is a failure for this candidate. The
    /// request is cut off at `deadline` even if the read timeout is longer.
    pub async fn get(&self, url: &str, deadline: Instant) -> Result<FetchedPage, FetchError> {
        let timeout = self
            .read_timeout
            .min(deadline.saturating_duration_since(Instant::now()));
        if timeout.is_zero() {
            return Err(FetchError::Timeout(self.read_timeout));
        }
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .header(USER_AGENT, pick_user_agent())
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "de-DE,de;q=0.9,en;q=0.8")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status().as_u16();
        if status != 200 {
            tracing::debug!(url, status, "Candidate answered with non-200 status");
            return Err(FetchError::Status(status));
        }

        let html = resp.text().await.map_err(|e| self.classify(e))?;
        Ok(FetchedPage {
            url: url.to_string(),
            html,
            status,
            strategy: FetchStrategy::Static,
        })
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        match FetchError::from(e) {
            FetchError::Timeout(_) => FetchError::Timeout(self.read_timeout),
            other => other,
        }
    }
}
