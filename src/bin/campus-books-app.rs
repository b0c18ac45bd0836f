use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use campus_books::app::{AppState, DEFAULT_CORS_ORIGINS};
use campus_books::catalog::ingest::Ingestor;
use campus_books::cli::{DEFAULT_DATABASE, SummaryEngineArgs};
use campus_books::config::CatalogConfig;
use campus_books::store::SqliteStore;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8000")]
    addr: SocketAddr,

    /// SQLite database file (created if missing).
    #[arg(long, default_value = DEFAULT_DATABASE)]
    database: PathBuf,

    /// YAML catalog config (sources, selectors, timeout, refresh mode).
    #[arg(long)]
    catalog_config: Option<PathBuf>,

    /// Allowed browser origin. Repeat for several; defaults to local dev servers.
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    #[command(flatten)]
    engine: SummaryEngineArgs,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    campus_books::logging::init()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting campus-books-app");

    let config = CatalogConfig::load_or_default(args.catalog_config.as_deref())?;
    let plan = config.plan().context("validate catalog config")?;
    tracing::info!(
        sources = plan.sources.len(),
        refresh = ?plan.refresh,
        "catalog plan loaded"
    );

    let store = Arc::new(SqliteStore::open(&args.database)?);
    let ingestor = Ingestor::over_http(store.clone(), plan)?;
    let summarizer = campus_books::llm::generator_from_args(&args.engine)?;
    let state = AppState {
        catalog: store.clone(),
        records: store,
        ingestor: Arc::new(ingestor),
        summarizer,
    };

    let cors_origins = if args.cors_origins.is_empty() {
        DEFAULT_CORS_ORIGINS.iter().map(|o| (*o).to_owned()).collect()
    } else {
        args.cors_origins.clone()
    };
    let app = campus_books::app::router(state, &cors_origins)?;

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
