use std::time::Duration;

use clap::Parser;

use crate::scrape::browser::BrowserOptions;
use crate::scrape::{PipelineConfig, RetryPolicy};

#[derive(Parser, Debug, Clone)]
#[command(name = "jobbig", about = "Job listing aggregator for German job boards")]
pub struct Config {
    /// Database connection URL. Without one, results are kept in memory.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Create the jobs table on startup
    #[arg(long, env = "CREATE_SCHEMA", default_value = "true")]
    pub create_schema: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    #[command(flatten)]
    pub scrape: ScrapeArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Knobs for the search pipeline and its fetchers.
#[derive(clap::Args, Debug, Clone)]
pub struct ScrapeArgs {
    /// Maximum records returned per search
    #[arg(long, env = "MAX_RESULTS", default_value = "9")]
    pub max_results: usize,

    /// Synthetic records returned when live extraction fails
    #[arg(long, env = "FALLBACK_COUNT", default_value = "3")]
    pub fallback_count: usize,

    /// End-to-end budget for one search, in milliseconds
    #[arg(long, env = "REQUEST_BUDGET_MS", default_value = "12000")]
    pub request_budget_ms: u64,

    /// Ceiling for a single candidate URL, in milliseconds
    #[arg(long, env = "CANDIDATE_TIMEOUT_MS", default_value = "15000")]
    pub candidate_timeout_ms: u64,

    #[arg(long, env = "CONNECT_TIMEOUT_MS", default_value = "4000")]
    pub connect_timeout_ms: u64,

    #[arg(long, env = "READ_TIMEOUT_MS", default_value = "10000")]
    pub read_timeout_ms: u64,

    /// Attempts per fetch, first try included
    #[arg(long, env = "FETCH_ATTEMPTS", default_value = "2")]
    pub fetch_attempts: usize,

    /// Render pages in headless Chrome before falling back to plain HTTP
    #[arg(long, env = "BROWSER_FETCH")]
    pub browser_fetch: bool,

    #[arg(long, env = "PAGE_LOAD_TIMEOUT_MS", default_value = "25000")]
    pub page_load_timeout_ms: u64,

    /// Scroll rounds used to trigger lazy-loaded listings (minimum 2)
    #[arg(long, env = "SCROLL_CYCLES", default_value = "3")]
    pub scroll_cycles: usize,

    /// Stop at the first page that reports no matches
    #[arg(long, env = "STOP_ON_NO_RESULTS")]
    pub stop_on_no_results: bool,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the web server (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen_addr: String,

        /// Directory with the search page and its assets
        #[arg(long, env = "STATIC_DIR", default_value = "static")]
        static_dir: String,
    },
    /// Run one search and print the response as JSON
    Search {
        /// Source name (stepstone, monster)
        #[arg(long)]
        source: String,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        city: String,
    },
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or_else(|| Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let s = &self.scrape;
        PipelineConfig {
            max_results: s.max_results.max(1),
            fallback_count: s.fallback_count,
            request_budget: Duration::from_millis(s.request_budget_ms),
            candidate_timeout: Duration::from_millis(s.candidate_timeout_ms),
            prefer_browser: s.browser_fetch,
            stop_on_no_results: s.stop_on_no_results,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.scrape.fetch_attempts.max(1),
            ..RetryPolicy::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.scrape.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.scrape.read_timeout_ms)
    }

    /// `None` unless browser rendering is switched on.
    pub fn browser_options(&self) -> Option<BrowserOptions> {
        self.scrape.browser_fetch.then(|| BrowserOptions {
            page_load_timeout: Duration::from_millis(self.scrape.page_load_timeout_ms),
            scroll_cycles: self.scrape.scroll_cycles,
            ..BrowserOptions::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_subcommand_parses() {
        let config = Config::try_parse_from([
            "jobbig", "search", "--source", "monster", "--title", "Koch", "--city", "Berlin",
        ])
        .unwrap();
        match config.resolved_command() {
            Command::Search { source, title, city } => {
                assert_eq!(source, "monster");
                assert_eq!(title, "Koch");
                assert_eq!(city, "Berlin");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_reach_the_pipeline() {
        let config = Config::try_parse_from([
            "jobbig",
            "--max-results",
            "5",
            "--request-budget-ms",
            "3000",
            "--browser-fetch",
            "--scroll-cycles",
            "1",
            "--fetch-attempts",
            "0",
        ])
        .unwrap();

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.max_results, 5);
        assert_eq!(pipeline.request_budget, Duration::from_secs(3));
        assert!(pipeline.prefer_browser);
        assert_eq!(config.retry_policy().max_attempts, 1);
        assert!(config.browser_options().is_some());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::try_parse_from(["jobbig"]).unwrap();
        if std::env::var_os("MAX_RESULTS").is_none() {
            assert_eq!(config.pipeline_config().max_results, 9);
        }
        if std::env::var_os("BROWSER_FETCH").is_none() {
            assert!(config.browser_options().is_none());
        }
        assert!(matches!(config.resolved_command(), Command::Serve { .. }));
    }
}
