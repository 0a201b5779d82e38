//! Fills the catalog from TMDB's popular listing, then rebuilds the similarity graph.
//!
//! Reads the same environment as the server plus `TMDB_API_KEY` and
//! `INGEST_PAGES`.

use cinematch::{
    config::Config,
    db::{self, PgCatalog, PgGraphStore},
    error::{AppError, EngineError},
    services::{
        ingest::{ingest_popular, PAGE_DELAY},
        providers::TmdbClient,
        recommendations::Recommender,
    },
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env()?;
    let tmdb = TmdbClient::from_config(&config)?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let catalog = PgCatalog::new(pool.clone());
    let store = PgGraphStore::new(pool);

    tracing::info!(pages = config.ingest_pages, "Fetching films from TMDB");
    let report = ingest_popular(&tmdb, &catalog, config.ingest_pages, PAGE_DELAY).await;
    tracing::info!(
        added = report.added,
        updated = report.updated,
        failed = report.failed,
        "Ingestion finished"
    );

    if report.written() == 0 {
        tracing::warn!("No films written, keeping the existing similarity graph");
        return Ok(());
    }

    let recommender = Recommender::default();

    match recommender.recompute(&catalog, &store).await {
        Ok(edges) => tracing::info!(edges, "Similarity graph stored"),
        Err(AppError::Engine(EngineError::InsufficientCorpus { found })) => {
            tracing::warn!(films = found, "Similarity recompute skipped: corpus too small");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
