//! Dynamic strategy: renders a page in a throwaway headless Chrome session.

use std::ffi::{OsStr, OsString};
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use headless_chrome::protocol::cdp::Page::AddScriptToEvaluateOnNewDocument;
use headless_chrome::{Browser, LaunchOptions};
use tokio::sync::Semaphore;

use super::fetcher::{FetchStrategy, FetchedPage};
use super::http::pick_user_agent;
use crate::error::FetchError;

/// Runs before any page script to hide the usual automation fingerprints.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['de-DE', 'de', 'en-US', 'en'] });
window.chrome = window.chrome || { runtime: {} };
"#;

const SCROLL_SCRIPT: &str = "window.scrollBy(0, document.body.scrollHeight)";

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub page_load_timeout: Duration,
    /// How long to wait for the source's marker element.
    pub marker_timeout: Duration,
    /// Fixed wait used when the marker never appears.
    pub settle_delay: Duration,
    pub scroll_cycles: usize,
    pub scroll_pause: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            page_load_timeout: Duration::from_secs(25),
            marker_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_secs(2),
            scroll_cycles: 3,
            scroll_pause: Duration::from_millis(800),
        }
    }
}

pub struct BrowserFetcher {
    options: BrowserOptions,
    /// One Chrome session at a time. The permit travels into the blocking
    /// task and is released only after the browser process is gone.
    session: Arc<Semaphore>,
}

impl BrowserFetcher {
    pub fn new(mut options: BrowserOptions) -> Self {
        // Lazy-loaded result lists need at least two scroll rounds.
        options.scroll_cycles = options.scroll_cycles.max(2);
        Self {
            options,
            session: Arc::new(Semaphore::new(1)),
        }
    }

    /// Render `url` and return its DOM. Every browser wait is clamped to
    /// `deadline`; dropping the returned future stops the session at its
    /// next step.
    pub async fn render(
        &self,
        url: &str,
        ready_marker: &'static str,
        deadline: Instant,
    ) -> Result<FetchedPage, FetchError> {
        let budget = SessionBudget::new(deadline, self.options.page_load_timeout);
        budget.check()?;

        let permit = self
            .session
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| FetchError::BrowserUnavailable(e.to_string()))?;

        let _cancel_on_drop = CancelOnDrop(budget.cancelled.clone());
        let options = self.options.clone();
        let target = url.to_string();
        let html = tokio::task::spawn_blocking(move || {
            let result = render_blocking(&target, ready_marker, &options, &budget);
            drop(permit);
            result
        })
        .await
        .map_err(|e| FetchError::Transport(format!("browser task failed: {e}")))??;

        Ok(FetchedPage {
            url: url.to_string(),
            html,
            status: 200,
            strategy: FetchStrategy::Dynamic { ready_marker },
        })
    }
}

/// Time left for one session plus the flag its caller sets on cancellation.
struct SessionBudget {
    deadline: Instant,
    limit: Duration,
    cancelled: Arc<AtomicBool>,
}

impl SessionBudget {
    fn new(deadline: Instant, limit: Duration) -> Self {
        Self {
            deadline,
            limit,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// `wait`, shortened so it cannot outlast the deadline.
    fn cap(&self, wait: Duration) -> Duration {
        wait.min(self.remaining())
    }

    fn check(&self) -> Result<(), FetchError> {
        if self.cancelled.load(Ordering::Relaxed) || self.remaining().is_zero() {
            Err(FetchError::Timeout(self.limit))
        } else {
            Ok(())
        }
    }
}

/// Flags the blocking session as abandoned when `render` is dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// One complete browser session. `browser` owns the Chrome process and is
/// dropped (killing it) on every return path, including errors.
fn render_blocking(
    url: &str,
    ready_marker: &str,
    options: &BrowserOptions,
    budget: &SessionBudget,
) -> Result<String, FetchError> {
    budget.check()?;
    let ua_arg = OsString::from(format!("--user-agent={}", pick_user_agent()));
    let args: Vec<&OsStr> = vec![
        ua_arg.as_os_str(),
        OsStr::new("--disable-blink-features=AutomationControlled"),
        OsStr::new("--lang=de-DE"),
        OsStr::new("--no-first-run"),
    ];

    let browser = Browser::new(LaunchOptions {
        headless: true,
        window_size: Some((1366, 900)),
        args,
        idle_browser_timeout: budget.remaining().max(Duration::from_secs(1)),
        ..Default::default()
    })
    .map_err(|e| FetchError::BrowserUnavailable(e.to_string()))?;

    budget.check()?;
    let tab = browser.new_tab().map_err(transport)?;
    tab.set_default_timeout(budget.cap(options.page_load_timeout));
    tab.call_method(AddScriptToEvaluateOnNewDocument {
        source: STEALTH_SCRIPT.to_string(),
        world_name: None,
        include_command_line_api: None,
        run_immediately: None,
    })
    .map_err(transport)?;

    tracing::debug!(url, "Rendering page in headless browser");
    tab.navigate_to(url)
        .map_err(|e| classify(e, budget.limit))?
        .wait_until_navigated()
        .map_err(|e| classify(e, budget.limit))?;

    budget.check()?;
    if tab
        .wait_for_element_with_custom_timeout(ready_marker, budget.cap(options.marker_timeout))
        .is_err()
    {
        tracing::debug!(url, ready_marker, "Marker not found, settling instead");
        std::thread::sleep(budget.cap(options.settle_delay));
    }

    for _ in 0..options.scroll_cycles {
        budget.check()?;
        tab.evaluate(SCROLL_SCRIPT, false).map_err(transport)?;
        std::thread::sleep(budget.cap(options.scroll_pause));
    }

    budget.check()?;
    let html = tab.get_content().map_err(transport)?;
    if let Err(e) = tab.close(true) {
        tracing::debug!(url, error = %e, "Closing tab failed, browser shutdown will reap it");
    }
    Ok(html)
}

fn transport(e: impl Display) -> FetchError {
    FetchError::Transport(e.to_string())
}

fn classify(e: impl Display, limit: Duration) -> FetchError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        FetchError::Timeout(limit)
    } else {
        FetchError::Transport(message)
    }
}
