// Listing-site profiles.
// Each source knows how to address its search pages and how to read them;
// fetching and orchestration live in `crate::scrape`.

pub mod monster;
pub mod stepstone;
pub mod urls;

use std::sync::Arc;

use url::Url;

use crate::models::job::SearchQuery;
use crate::scrape::cascade::Rule;

/// Ordered selector cascades for one site. Every list runs from the most
/// specific, current markup to the most generic fallback.
#[derive(Debug)]
pub struct SelectorProfile {
    pub containers: &'static [&'static str],
    pub title: &'static [Rule],
    pub company: &'static [Rule],
    pub location: &'static [Rule],
    pub link: &'static [Rule],
}

/// Trait that all listing sources implement.
pub trait JobSource: Send + Sync {
    /// Identifier stored in the `source` column and used in routes.
    fn name(&self) -> &'static str;

    /// Origin that relative listing links are resolved against.
    fn base_url(&self) -> &Url;

    /// Candidate search URLs, most likely to work first. Pure and
    /// deterministic for a given query.
    fn candidate_urls(&self, query: &SearchQuery) -> Vec<String>;

    fn selectors(&self) -> &'static SelectorProfile;

    /// Lowercase phrases the site prints when a search matched nothing.
    fn no_results_markers(&self) -> &'static [&'static str];

    /// CSS selector the browser strategy waits for before capturing.
    fn ready_marker(&self) -> &'static str;
}

/// Source identifiers accepted by [`get_source`].
pub const SOURCE_NAMES: &[&str] = &[stepstone::NAME, monster::NAME];

/// Look up a source by its identifier.
pub fn get_source(name: &str) -> Option<Arc<dyn JobSource>> {
    let base = match name {
        stepstone::NAME => stepstone::BASE_URL,
        monster::NAME => monster::BASE_URL,
        _ => return None,
    };
    get_source_with_base(name, Url::parse(base).ok()?)
}

/// Like [`get_source`] but pointed at a different origin.
pub fn get_source_with_base(name: &str, base: Url) -> Option<Arc<dyn JobSource>> {
    match name {
        stepstone::NAME => Some(Arc::new(stepstone::Stepstone::with_base_url(base))),
        monster::NAME => Some(Arc::new(monster::Monster::with_base_url(base))),
        _ => None,
    }
}

/// Base origin without a trailing slash, for string-built candidate URLs.
pub(crate) fn origin(base: &Url) -> String {
    base.as_str().trim_end_matches('/').to_string()
}
