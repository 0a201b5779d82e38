use std::time::Duration;

use crate::{
    error::AppResult,
    models::{FilmId, NewFilm},
    services::providers::MovieSource,
};

/// Pause between listing pages to stay under the provider's rate limit
pub const PAGE_DELAY: Duration = Duration::from_millis(300);

/// Write side of the catalog used by ingestion
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FilmWriter: Send + Sync {
    /// Inserts or refreshes a film keyed by its TMDB id; `true` when newly inserted
    async fn upsert(&self, film: &NewFilm) -> AppResult<(FilmId, bool)>;
}

#[async_trait::async_trait]
impl FilmWriter for crate::db::PgCatalog {
    async fn upsert(&self, film: &NewFilm) -> AppResult<(FilmId, bool)> {
        crate::db::PgCatalog::upsert(self, film).await
    }
}

/// Outcome of one ingestion run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub added: usize,
    pub updated: usize,
    pub failed: usize,
}

impl IngestReport {
    /// Number of films written during the run
    pub fn written(&self) -> usize {
        self.added + self.updated
    }
}

/// Copies the first `pages` pages of the popular listing into the catalog
///
/// Failures on a single page or film are logged, counted and skipped.
pub async fn ingest_popular(
    source: &dyn MovieSource,
    writer: &dyn FilmWriter,
    pages: u32,
    page_delay: Duration,
) -> IngestReport {
    let mut report = IngestReport::default();

    for page in 1..=pages {
        let listing = match source.popular_page(page).await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(page, provider = source.name(), error = %e, "Skipping listing page");
                report.failed += 1;
                continue;
            }
        };

        for movie in &listing.results {
            match store_one(source, writer, movie.id).await {
                Ok(true) => report.added += 1,
                Ok(false) => report.updated += 1,
                Err(e) => {
                    tracing::warn!(tmdb_id = movie.id, error = %e, "Skipping film");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            page,
            added = report.added,
            updated = report.updated,
            "Ingested listing page"
        );

        if listing.total_pages != 0 && page >= listing.total_pages {
            break;
        }
        if page < pages && !page_delay.is_zero() {
            tokio::time::sleep(page_delay).await;
        }
    }

    report
}

async fn store_one(
    source: &dyn MovieSource,
    writer: &dyn FilmWriter,
    tmdb_id: i64,
) -> AppResult<bool> {
    let film = source.movie_details(tmdb_id).await?;
    let (_, inserted) = writer.upsert(&film).await?;
    Ok(inserted)
}
