// Page acquisition and listing extraction.
// `pipeline` drives the other pieces: it walks a source's candidate URLs,
// fetches each through a `PageFetcher`, extracts with the source's selector
// cascades and falls back to synthetic records when nothing works.

pub mod browser;
pub mod cascade;
pub mod extract;
pub mod fallback;
pub mod fetcher;
pub mod http;
pub mod pipeline;

pub use fetcher::{FetchStrategy, FetchedPage, PageFetcher, RetryPolicy, SiteFetcher};
pub use pipeline::{Pipeline, PipelineConfig, SearchOutcome};
