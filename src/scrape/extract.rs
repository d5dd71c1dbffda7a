//! Turns a fetched result page into normalized [`JobRecord`]s.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use super::cascade::{CompiledRule, compile_rules, compile_selectors, locate_field, locate_listings};
use crate::models::job::{JobRecord, MAX_FIELD_LEN, SearchQuery, UNKNOWN_COMPANY, clean_text};
use crate::sources::JobSource;

/// Result of reading one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// At least one listing survived extraction.
    Listings(Vec<JobRecord>),
    /// The page loaded and explicitly says the search matched nothing.
    NoResults { marker: &'static str },
    /// The page loaded but no container yielded a usable listing.
    Empty,
}

/// A source's selector cascades, compiled once and reused for every page.
pub struct ListingExtractor {
    source: &'static str,
    base: Url,
    markers: &'static [&'static str],
    containers: Vec<Selector>,
    title: Vec<CompiledRule>,
    company: Vec<CompiledRule>,
    location: Vec<CompiledRule>,
    link: Vec<CompiledRule>,
}

impl ListingExtractor {
    pub fn for_source(source: &dyn JobSource) -> Self {
        let profile = source.selectors();
        Self {
            source: source.name(),
            base: source.base_url().clone(),
            markers: source.no_results_markers(),
            containers: compile_selectors(profile.containers),
            title: compile_rules(profile.title),
            company: compile_rules(profile.company),
            location: compile_rules(profile.location),
            link: compile_rules(profile.link),
        }
    }

    /// Extract up to `cap` listings from `html`. Listings without a title or
    /// a resolvable link are dropped silently.
    pub fn extract(&self, html: &str, query: &SearchQuery, cap: usize) -> Extraction {
        let document = Html::parse_document(html);

        if let Some(marker) = self.no_results_marker(&document) {
            return Extraction::NoResults { marker };
        }

        let mut seen = HashSet::new();
        let jobs: Vec<JobRecord> = locate_listings(&document, &self.containers, cap)
            .into_iter()
            .filter_map(|container| {
                let title = locate_field(container, &self.title)?;
                let url = self.resolve_link(&locate_field(container, &self.link)?)?;
                if !seen.insert(url.clone()) {
                    return None;
                }
                let company = locate_field(container, &self.company)
                    .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
                let location =
                    locate_field(container, &self.location).unwrap_or_else(|| query.city.clone());
                Some(JobRecord::new(&title, &company, &location, &url, self.source))
            })
            .filter(JobRecord::is_well_formed)
            .collect();

        tracing::debug!(source = self.source, count = jobs.len(), "Extracted listings");

        if jobs.is_empty() {
            Extraction::Empty
        } else {
            Extraction::Listings(jobs)
        }
    }

    fn no_results_marker(&self, document: &Html) -> Option<&'static str> {
        let text = visible_text(document);
        self.markers.iter().copied().find(|m| text.contains(m))
    }

    /// Resolve `href` against the source origin. Over-long URLs lose their
    /// query and fragment to fit the column; if that is not enough the link
    /// is rejected.
    fn resolve_link(&self, href: &str) -> Option<String> {
        if href.starts_with('#') {
            return None;
        }
        let mut url = self.base.join(href).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        if url.as_str().len() > MAX_FIELD_LEN {
            url.set_query(None);
            url.set_fragment(None);
        }
        (url.as_str().len() <= MAX_FIELD_LEN).then(|| url.to_string())
    }
}

/// Elements whose text never renders (inline code, i18n bundles, inert
/// templates).
const HIDDEN_TEXT_PARENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Lowercased, whitespace-collapsed text a visitor would actually see.
fn visible_text(document: &Html) -> String {
    let parts: Vec<&str> = document
        .tree
        .root()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|parent| {
                parent
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_TEXT_PARENTS.contains(&el.name()))
            });
            (!hidden).then_some(&**text)
        })
        .collect();
    clean_text(&parts.join(" ").to_lowercase())
}
