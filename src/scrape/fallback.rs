//! Deterministic placeholder listings, the pipeline's last resort.

use crate::models::job::{JobRecord, MAX_FIELD_LEN, SearchQuery};
use crate::sources::JobSource;

/// Title used when the caller left it blank.
pub const DEFAULT_TITLE: &str = "Fachkraft";
/// Location used when the caller left it blank.
pub const DEFAULT_CITY: &str = "Deutschland";

const COMPANIES: &[&str] = &[
    "Muster GmbH",
    "Beispiel AG",
    "Demo Solutions GmbH",
    "Platzhalter & Co. KG",
];

/// Why the records are synthetic; appended to `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Live extraction produced nothing, or the query was incomplete.
    Example,
    /// The request budget ran out before a candidate succeeded.
    Timeout,
}

impl Provenance {
    pub fn tag(&self) -> &'static str {
        match self {
            Provenance::Example => "example",
            Provenance::Timeout => "timeout",
        }
    }
}

/// Build `count` (at least one) placeholder records from the literal query
/// terms. Never fails and has no I/O.
pub fn synthesize(
    source: &dyn JobSource,
    query: &SearchQuery,
    count: usize,
    provenance: Provenance,
) -> Vec<JobRecord> {
    let title = if query.title.is_empty() {
        DEFAULT_TITLE
    } else {
        query.title.as_str()
    };
    let city = if query.city.is_empty() {
        DEFAULT_CITY
    } else {
        query.city.as_str()
    };
    let url = query
        .is_complete()
        .then(|| source.candidate_urls(query).into_iter().next())
        .flatten()
        .filter(|u| u.len() <= MAX_FIELD_LEN)
        .unwrap_or_else(|| source.base_url().to_string());
    let tagged_source = format!("{}-{}", source.name(), provenance.tag());

    (0..count.max(1))
        .map(|i| {
            let job_title = match i % 4 {
                0 => format!("Senior {title}"),
                1 => title.to_string(),
                2 => format!("Lead {title}"),
                _ => format!("Junior {title}"),
            };
            JobRecord::new(
                &job_title,
                COMPANIES[i % COMPANIES.len()],
                city,
                &url,
                &tagged_source,
            )
        })
        .collect()
}
