use std::sync::Arc;

use cinematch::{
    config::Config,
    db::{self, redis::CacheWriterHandle, Cache, PgCatalog, PgGraphStore},
    error::{AppError, EngineError},
    routes::{create_router, AppState},
    services::recommendations::Recommender,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let catalog = Arc::new(PgCatalog::new(pool.clone()));
    let store = Arc::new(PgGraphStore::new(pool));

    let (cache, cache_writer) = connect_cache(&config)?;

    let recommender = Arc::new(Recommender::load(store.as_ref()).await?);

    if config.recompute_on_startup {
        match recommender
            .recompute(catalog.as_ref(), store.as_ref())
            .await
        {
            Ok(_) => {}
            Err(AppError::Engine(EngineError::InsufficientCorpus { found })) => {
                tracing::warn!(films = found, "Startup recompute skipped: corpus too small");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let state = AppState {
        catalog,
        store,
        recommender,
        cache,
    };
    let app = create_router(state, &config.cors_origins);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

/// Redis cache, or `None` when `REDIS_URL` is not configured
fn connect_cache(config: &Config) -> anyhow::Result<(Option<Cache>, Option<CacheWriterHandle>)> {
    let Some(redis_url) = config.redis_url.as_deref() else {
        tracing::info!("REDIS_URL not set, caching disabled");
        return Ok((None, None));
    };

    let client = db::create_redis_client(redis_url)?;
    let (cache, writer) = Cache::new(client, config.cache_ttl_seconds);
    tracing::info!(ttl_seconds = config.cache_ttl_seconds, "Redis cache enabled");

    Ok((Some(cache), Some(writer)))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
