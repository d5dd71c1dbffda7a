use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobbig::config::{Command, Config};
use jobbig::db;
use jobbig::models::job::SearchQuery;
use jobbig::routes::{self, AppState};
use jobbig::scrape::browser::BrowserFetcher;
use jobbig::scrape::http::HttpFetcher;
use jobbig::scrape::{PageFetcher, Pipeline, SiteFetcher};
use jobbig::sources::{SOURCE_NAMES, get_source};
use jobbig::store::{JobStore, MemoryJobStore, PgJobStore};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jobbig=info,tower_http=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn JobStore>> {
    let Some(url) = &config.database_url else {
        tracing::info!("No DATABASE_URL set, keeping jobs in memory");
        return Ok(Arc::new(MemoryJobStore::new()));
    };

    let pool = db::create_pool(url).context("invalid DATABASE_URL")?;
    if config.create_schema {
        tracing::info!("Ensuring jobs table exists...");
        // Not fatal: the store creates the table on first write as well.
        if let Err(e) = db::ensure_schema(&pool).await {
            tracing::warn!(error = %e, "Database not reachable at startup");
        }
    }
    Ok(Arc::new(PgJobStore::new(pool)))
}

fn build_state(config: &Config, store: Arc<dyn JobStore>) -> anyhow::Result<AppState> {
    let http = HttpFetcher::new(config.connect_timeout(), config.read_timeout())
        .context("failed to build HTTP client")?;
    let browser = config.browser_options().map(BrowserFetcher::new);
    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(SiteFetcher::new(http, browser, config.retry_policy()));

    let pipeline_config = config.pipeline_config();
    let pipelines = SOURCE_NAMES
        .iter()
        .filter_map(|name| get_source(name))
        .map(|source| {
            Pipeline::new(
                source,
                fetcher.clone(),
                store.clone(),
                pipeline_config.clone(),
            )
        });
    Ok(AppState::new(store.clone(), pipelines))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);

    let store = build_store(&config).await?;
    let state = build_state(&config, store)?;

    match config.resolved_command() {
        Command::Serve {
            listen_addr,
            static_dir,
        } => {
            let static_dir = Path::new(&static_dir);
            if !static_dir.is_dir() {
                tracing::warn!(dir = %static_dir.display(), "Static directory missing, serving API only");
            }
            let app = routes::app(state, static_dir.is_dir().then_some(static_dir));

            let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
            tracing::info!("Listening on {}", listen_addr);
            axum::serve(listener, app).await?;
        }
        Command::Search {
            source,
            title,
            city,
        } => {
            let pipeline = state
                .pipeline(&source)
                .with_context(|| format!("unknown source '{source}', expected one of {SOURCE_NAMES:?}"))?;
            let outcome = pipeline
                .search(&SearchQuery::new(&title, &city))
                .await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
