use serde::{Deserialize, Serialize};

/// Column width of every text column in the `jobs` table.
pub const MAX_FIELD_LEN: usize = 200;

/// Company placeholder for listings whose employer could not be extracted.
pub const UNKNOWN_COMPANY: &str = "unknown";

/// A single job listing, either freshly scraped, synthesized, or loaded from
/// the store. `id` is only set once the record has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub source: String,
}

impl JobRecord {
    /// Build an unsaved record, collapsing whitespace and clamping every text
    /// field to the column width. An empty company becomes [`UNKNOWN_COMPANY`].
    pub fn new(title: &str, company: &str, location: &str, url: &str, source: &str) -> Self {
        let company = clean_text(company);
        Self {
            id: None,
            title: truncate_chars(&clean_text(title), MAX_FIELD_LEN),
            company: if company.is_empty() {
                UNKNOWN_COMPANY.to_string()
            } else {
                truncate_chars(&company, MAX_FIELD_LEN)
            },
            location: truncate_chars(&clean_text(location), MAX_FIELD_LEN),
            url: url.trim().to_string(),
            source: source.to_string(),
        }
    }

    /// True when the record satisfies the output contract: a non-empty title
    /// and an absolute http(s) URL.
    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty()
            && url::Url::parse(&self.url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false)
    }
}

/// Caller-supplied search terms, trimmed but otherwise unsanitized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub city: String,
}

impl SearchQuery {
    pub fn new(title: &str, city: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            city: city.trim().to_string(),
        }
    }

    /// Live fetching only happens when both terms are present.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.city.is_empty()
    }
}

/// Optional lookup criteria for stored jobs. Empty strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilters {
    pub title: Option<String>,
    pub city: Option<String>,
    pub source: Option<String>,
}

impl JobFilters {
    /// Drop blank criteria and trim the rest.
    pub fn normalized(&self) -> JobFilters {
        let keep = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        JobFilters {
            title: keep(&self.title),
            city: keep(&self.city),
            source: keep(&self.source),
        }
    }

    /// In-process equivalent of the SQL filter: case-insensitive substring on
    /// title and location, exact match on source.
    pub fn matches(&self, job: &JobRecord) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_deref()
                .is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };
        contains(&job.title, &self.title)
            && contains(&job.location, &self.city)
            && self.source.as_deref().is_none_or(|s| job.source == s)
    }
}

/// Collapse runs of whitespace (including newlines from nested markup) into
/// single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clamp to `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_cleans_and_defaults() {
        let job = JobRecord::new(
            "  Elektriker \n (m/w/d) ",
            "   ",
            " Köln ",
            "https://www.stepstone.de/a",
            "stepstone",
        );
        assert_eq!(job.title, "Elektriker (m/w/d)");
        assert_eq!(job.company, UNKNOWN_COMPANY);
        assert_eq!(job.location, "Köln");
        assert!(job.id.is_none());
        assert!(job.is_well_formed());
    }

    #[test]
    fn title_is_truncated_on_char_boundary() {
        let long = "ü".repeat(250);
        let job = JobRecord::new(&long, "ACME", "Köln", "https://x.de", "monster");
        assert_eq!(job.title.chars().count(), MAX_FIELD_LEN);
    }

    #[test]
    fn relative_or_empty_urls_are_not_well_formed() {
        let relative = JobRecord::new("Dev", "ACME", "Köln", "/jobs/1", "stepstone");
        assert!(!relative.is_well_formed());

        let ftp = JobRecord::new("Dev", "ACME", "Köln", "ftp://x.de/1", "stepstone");
        assert!(!ftp.is_well_formed());

        let untitled = JobRecord::new("  ", "ACME", "Köln", "https://x.de", "stepstone");
        assert!(!untitled.is_well_formed());
    }

    #[test]
    fn query_completeness_requires_both_terms() {
        assert!(SearchQuery::new(" Elektriker ", "Köln").is_complete());
        assert!(!SearchQuery::new("Elektriker", "  ").is_complete());
        assert!(!SearchQuery::new("", "").is_complete());
    }

    #[test]
    fn filters_ignore_blanks_and_match_case_insensitively() {
        let filters = JobFilters {
            title: Some("elektr".into()),
            city: Some("  ".into()),
            source: Some("stepstone".into()),
        }
        .normalized();
        assert!(filters.city.is_none());

        let job = JobRecord::new("Elektriker", "ACME", "Köln", "https://x.de", "stepstone");
        assert!(filters.matches(&job));

        let other = JobRecord::new("Elektriker", "ACME", "Köln", "https://x.de", "monster");
        assert!(!filters.matches(&other));
    }
}
