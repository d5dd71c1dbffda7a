use url::Url;

use super::urls::{dedup_preserving_order, path_slug, query_words};
use super::{JobSource, SelectorProfile, origin};
use crate::models::job::SearchQuery;
use crate::scrape::cascade::Rule;

pub const NAME: &str = "monster";
pub const BASE_URL: &str = "https://www.monster.de";

static SELECTORS: SelectorProfile = SelectorProfile {
    containers: &[
        "article[data-testid='svx_jobCard']",
        "[data-testid='JobCard']",
        "div.card-content",
        "li[class*='job-search-result']",
        "article",
    ],
    title: &[
        Rule::text("[data-testid='jobTitle']"),
        Rule::text("h2.title"),
        Rule::text("h3"),
        Rule::text("h2"),
    ],
    company: &[
        Rule::text("[data-testid='company']"),
        Rule::text("div.company"),
        Rule::text("[class*='company']"),
    ],
    location: &[
        Rule::text("[data-testid='jobDetailLocation']"),
        Rule::text("div.location"),
        Rule::text("[class*='location']"),
    ],
    link: &[
        Rule::attr("a[data-testid='jobTitle']", "href"),
        Rule::attr("a.card-title-link", "href"),
        Rule::attr("h2 a", "href"),
        Rule::attr("h3 a", "href"),
        Rule::attr("a[href*='/job-openings/']", "href"),
        Rule::attr("a[href]", "href"),
        Rule::own_attr("href"),
    ],
};

static NO_RESULTS: &[&str] = &[
    "keine ergebnisse",
    "wir konnten keine jobs finden",
    "leider keine passenden",
    "sorry, we didn't find any jobs",
    "no jobs found",
];

/// monster.de. Result pages are rendered client-side on the current
/// template, so this source benefits most from the browser strategy.
pub struct Monster {
    base: Url,
}

impl Monster {
    pub fn with_base_url(base: Url) -> Self {
        Self { base }
    }
}

impl JobSource for Monster {
    fn name(&self) -> &'static str {
        NAME
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    fn candidate_urls(&self, query: &SearchQuery) -> Vec<String> {
        let base = origin(&self.base);
        let title_q = query_words(&query.title);
        let city_q = query_words(&query.city);
        let title = path_slug(&query.title);
        let city = path_slug(&query.city);

        let mut urls = vec![
            format!("{base}/jobs/suche/?q={title_q}&where={city_q}"),
            format!("{base}/jobs/suche?q={title_q}&where={city_q}&page=1"),
        ];
        if !title.is_empty() && !city.is_empty() {
            urls.push(format!("{base}/jobs/q-{title}-l-{city}.aspx"));
        }
        dedup_preserving_order(urls)
    }

    fn selectors(&self) -> &'static SelectorProfile {
        &SELECTORS
    }

    fn no_results_markers(&self) -> &'static [&'static str] {
        NO_RESULTS
    }

    fn ready_marker(&self) -> &'static str {
        "article, div.card-content"
    }
}
