#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::Router;
use url::Url;

use jobbig::error::FetchError;
use jobbig::scrape::http::HttpFetcher;
use jobbig::scrape::{FetchStrategy, FetchedPage, PageFetcher, RetryPolicy, SiteFetcher};

/// Serve `router` on an ephemeral local port and return its origin.
pub async fn spawn_fixture(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// A stepstone-style result list with `n` listings and relative links.
pub fn listings_html(n: usize, title: &str) -> String {
    let items: String = (0..n)
        .map(|i| {
            format!(
                r#"<article data-at="job-item">
                     <a data-at="job-item-title" href="/stellenangebote--{i}.html">{title} {i}</a>
                     <span data-at="job-item-company-name">Firma {i}</span>
                     <span data-at="job-item-location">Köln</span>
                   </article>"#
            )
        })
        .collect();
    format!("<html><body><main>{items}</main></body></html>")
}

pub fn no_results_html() -> &'static str {
    "<html><body><p>Leider keine Treffer für Ihre Suche.</p></body></html>"
}

/// The production fetcher with short timeouts and a single attempt.
pub fn http_fetcher(read_timeout: Duration) -> Arc<dyn PageFetcher> {
    let http = HttpFetcher::new(Duration::from_secs(1), read_timeout).unwrap();
    let retry = RetryPolicy {
        max_attempts: 1,
        ..RetryPolicy::default()
    };
    Arc::new(SiteFetcher::new(http, None, retry))
}

/// Returns the same page for every URL.
pub struct FixedPage(pub String);

#[async_trait]
impl PageFetcher for FixedPage {
    async fn fetch(
        &self,
        url: &str,
        strategy: FetchStrategy,
        _deadline: Instant,
    ) -> Result<FetchedPage, FetchError> {
        Ok(FetchedPage {
            url: url.to_string(),
            html: self.0.clone(),
            status: 200,
            strategy,
        })
    }
}
