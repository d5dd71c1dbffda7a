use url::Url;

use super::urls::{dedup_preserving_order, path_slug, query_words};
use super::{JobSource, SelectorProfile, origin};
use crate::models::job::SearchQuery;
use crate::scrape::cascade::Rule;

pub const NAME: &str = "stepstone";
pub const BASE_URL: &str = "https://www.stepstone.de";

static SELECTORS: SelectorProfile = SelectorProfile {
    containers: &[
        "article[data-at='job-item']",
        "article[data-testid='job-item']",
        "article.ResultsListEntry",
        "div[data-genesis-element='CARD']",
        "article",
    ],
    title: &[
        Rule::text("[data-at='job-item-title']"),
        Rule::text("[data-testid='job-item-title']"),
        Rule::text("h2.ResultsListEntry-title"),
        Rule::text("h2"),
        Rule::text("h3"),
    ],
    company: &[
        Rule::text("[data-at='job-item-company-name']"),
        Rule::text("span.ResultsListEntry-company"),
        Rule::text("[class*='company']"),
    ],
    location: &[
        Rule::text("[data-at='job-item-location']"),
        Rule::text("span.ResultsListEntry-location"),
        Rule::text("[class*='location']"),
    ],
    link: &[
        Rule::attr("a[data-at='job-item-title']", "href"),
        Rule::attr("[data-at='job-item-title'] a", "href"),
        Rule::attr("a.ResultsListEntry-link", "href"),
        Rule::attr("h2 a", "href"),
        Rule::attr("a[href*='stellenangebote']", "href"),
        Rule::attr("a[href]", "href"),
        Rule::own_attr("href"),
    ],
};

static NO_RESULTS: &[&str] = &[
    "keine passenden jobs",
    "es wurden keine jobs gefunden",
    "leider keine treffer",
    "no jobs found",
];

/// stepstone.de, Germany's largest job board. Serves server-rendered result
/// lists on the current `/jobs/{title}/in-{city}` scheme and still answers
/// the legacy `ergebnisliste.html` template.
pub struct Stepstone {
    base: Url,
}

impl Stepstone {
    pub fn with_base_url(base: Url) -> Self {
        Self { base }
    }
}

impl JobSource for Stepstone {
    fn name(&self) -> &'static str {
        NAME
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    fn candidate_urls(&self, query: &SearchQuery) -> Vec<String> {
        let base = origin(&self.base);
        let title = path_slug(&query.title);
        let city = path_slug(&query.city);
        let title_q = query_words(&query.title);
        let city_q = query_words(&query.city);

        let mut urls = Vec::with_capacity(4);
        if !title.is_empty() && !city.is_empty() {
            urls.push(format!("{base}/jobs/{title}/in-{city}"));
            urls.push(format!("{base}/jobs/{title}/in-{city}?radius=30"));
        }
        if !title.is_empty() {
            urls.push(format!("{base}/jobs/{title}?where={city_q}"));
        }
        urls.push(format!("{base}/5/ergebnisliste.html?ke={title_q}&ws={city_q}"));
        dedup_preserving_order(urls)
    }

    fn selectors(&self) -> &'static SelectorProfile {
        &SELECTORS
    }

    fn no_results_markers(&self) -> &'static [&'static str] {
        NO_RESULTS
    }

    fn ready_marker(&self) -> &'static str {
        "article"
    }
}
